//! Imaging Module
//!
//! Pixel work done after OCR:
//! - Erasing the original text ([`Inpainter`])
//! - Shaping and drawing the Arabic translation ([`TextRenderer`])

mod inpaint;
mod render;
pub mod shaping;

pub use inpaint::{FastMarchingInpainter, Inpainter};
pub use render::{ArabicRenderer, TextLayout, TextRenderer};

use crate::ocr::BoundingBox;

/// Text to draw and where
#[derive(Debug, Clone, PartialEq)]
pub struct TextPlacement {
    pub text: String,
    pub bbox: BoundingBox,
}

impl TextPlacement {
    pub fn new(text: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            text: text.into(),
            bbox,
        }
    }
}

/// Imaging errors
#[derive(Debug, thiserror::Error)]
pub enum ImagingError {
    #[error("Inpainting failed: {0}")]
    Inpainting(String),

    #[error("Rendering failed: {0}")]
    Rendering(String),

    #[error("Failed to load font: {0}")]
    FontLoad(String),
}
