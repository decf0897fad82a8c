//! Pipeline Module
//!
//! Drives uploads through unpack → OCR → translate → inpaint → render and
//! packages the processed pages.
//!
//! Per page: `Pending → Extracted → Translated → Inpainted → Rendered`, or
//! `Failed` at any step, in which case the page is passed through unmodified.

mod archive;
mod orchestrator;
mod types;

pub use archive::{archive_file_name, page_entry_name, single_entry_name, ResultArchive, BATCH_ARCHIVE_NAME};
pub use orchestrator::{Pipeline, PipelineSettings};
pub use types::{
    FailureKind, PageState, PipelineError, PipelineOutput, ProcessedPage, RequestStage,
    TranslatedDetection,
};
