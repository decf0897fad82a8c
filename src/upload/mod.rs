//! Upload Module
//!
//! Handles everything between the multipart body and the pipeline:
//! - Size and format validation ([`FileValidator`])
//! - Resolution of the upload to a closed [`UploadKind`]
//! - The per-request temporary workspace ([`RequestWorkspace`])

pub mod types;
pub mod validator;
pub mod workspace;

pub use types::*;
pub use validator::FileValidator;
pub use workspace::{RequestWorkspace, WORKSPACE_PREFIX};
