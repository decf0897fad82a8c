//! Arabic Image Translator
//!
//! Translates the text embedded in images, PDFs and comic archives to
//! Arabic and draws the translation back in place of the original.
//!
//! # Modules
//!
//! - `upload`: validation of incoming files and per-request workspaces
//! - `unpack`: page extraction from PDFs and archives
//! - `ocr`: text detection
//! - `translate`: translation providers and language detection
//! - `imaging`: inpainting and Arabic text rendering
//! - `pipeline`: per-upload orchestration and result packaging
//! - `routes`: HTTP endpoints

pub mod config;
pub mod error;
pub mod imaging;
pub mod ocr;
pub mod pipeline;
pub mod routes;
pub mod state;
pub mod translate;
pub mod unpack;
pub mod upload;
