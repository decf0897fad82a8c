//! Pipeline types

use std::fmt;

use serde::Serialize;

use crate::imaging::TextPlacement;
use crate::ocr::{BoundingBox, Detection};
use crate::translate::TranslationOutcome;
use crate::unpack::UnpackError;

/// Milestones of one request, logged as they are reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStage {
    Received,
    Validated,
    Unpacked,
    Packaged,
    Delivered,
}

impl fmt::Display for RequestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Validated => "validated",
            Self::Unpacked => "unpacked",
            Self::Packaged => "packaged",
            Self::Delivered => "delivered",
        };
        f.write_str(name)
    }
}

/// Step at which a page failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Ocr,
    Inpainting,
    Rendering,
    Encoding,
}

/// Where a page is in its processing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "failure")]
pub enum PageState {
    Pending,
    Extracted,
    Translated,
    Inpainted,
    Rendered,
    Failed(FailureKind),
}

impl PageState {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ocr => "ocr",
            Self::Inpainting => "inpainting",
            Self::Rendering => "rendering",
            Self::Encoding => "encoding",
        };
        f.write_str(name)
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Extracted => f.write_str("extracted"),
            Self::Translated => f.write_str("translated"),
            Self::Inpainted => f.write_str("inpainted"),
            Self::Rendered => f.write_str("rendered"),
            Self::Failed(kind) => write!(f, "failed({})", kind),
        }
    }
}

/// A detection paired with its translation
///
/// `bbox` is the expanded box, used both to erase and to draw.
#[derive(Debug, Clone)]
pub struct TranslatedDetection {
    pub detection: Detection,
    pub bbox: BoundingBox,
    pub translated_text: String,
    pub outcome: TranslationOutcome,
}

impl TranslatedDetection {
    pub fn placement(&self) -> TextPlacement {
        TextPlacement::new(self.translated_text.clone(), self.bbox)
    }
}

/// Final result for one page
#[derive(Debug, Clone)]
pub struct ProcessedPage {
    /// Index of the source page, fixes the output order
    pub index: usize,
    pub name: String,
    pub state: PageState,
    /// PNG encoding of the page
    pub png: Vec<u8>,
    /// Detections drawn on the page
    pub detections: usize,
    /// Detections drawn in their original language because translation failed
    pub fallbacks: usize,
    pub width: u32,
    pub height: u32,
}

/// Every page of one upload, in upload order
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    pub pages: Vec<ProcessedPage>,
}

impl PipelineOutput {
    pub fn total(&self) -> usize {
        self.pages.len()
    }

    pub fn failed(&self) -> usize {
        self.pages.iter().filter(|p| p.state.is_failed()).count()
    }
}

/// Pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Unpack(#[from] UnpackError),

    #[error("No page could be processed ({pages} failed)")]
    NoContentProcessed {
        pages: usize,
        /// Every failure came from the OCR engine
        upstream_only: bool,
    },

    #[error("Failed to package results: {0}")]
    Packaging(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Background task failed: {0}")]
    Task(String),
}

impl PipelineError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::Unpack(e) => e.status_code(),
            Self::NoContentProcessed {
                upstream_only: true,
                ..
            } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<zip::result::ZipError> for PipelineError {
    fn from(e: zip::result::ZipError) -> Self {
        Self::Packaging(e.to_string())
    }
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}
