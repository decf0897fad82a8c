//! OCR Types
//!
//! Defines detections and pixel geometry shared by the OCR, imaging and
//! pipeline modules.

use serde::{Deserialize, Serialize};

/// Axis-aligned pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Smallest box containing both
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        BoundingBox {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
        }
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Restrict the box to an image of the given size
    pub fn clamp_to(&self, image_width: u32, image_height: u32) -> BoundingBox {
        let x = self.x.min(image_width);
        let y = self.y.min(image_height);
        BoundingBox {
            x,
            y,
            width: self.right().min(image_width) - x,
            height: self.bottom().min(image_height) - y,
        }
    }

    /// Multiply every coordinate by `factor`, rounding outward
    pub fn scale(&self, factor: f32) -> BoundingBox {
        let x = (self.x as f32 * factor).floor().max(0.0);
        let y = (self.y as f32 * factor).floor().max(0.0);
        let right = (self.right() as f32 * factor).ceil();
        let bottom = (self.bottom() as f32 * factor).ceil();
        BoundingBox {
            x: x as u32,
            y: y as u32,
            width: (right - x).max(0.0) as u32,
            height: (bottom - y).max(0.0) as u32,
        }
    }

    /// Grow the box by `ratio` of its size, split evenly between opposite
    /// sides, and clamp it to the image
    pub fn expand(&self, ratio: f32, image_width: u32, image_height: u32) -> BoundingBox {
        let pad_x = (self.width as f32 * ratio / 2.0).round() as u32;
        let pad_y = (self.height as f32 * ratio / 2.0).round() as u32;
        let x = self.x.saturating_sub(pad_x);
        let y = self.y.saturating_sub(pad_y);
        BoundingBox {
            x,
            y,
            width: self.right().saturating_add(pad_x) - x,
            height: self.bottom().saturating_add(pad_y) - y,
        }
        .clamp_to(image_width, image_height)
    }
}

/// One recognized text region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub text: String,
    pub bbox: BoundingBox,
    /// Recognition confidence in `[0, 1]`
    pub confidence: f32,
}

impl Detection {
    pub fn new(text: impl Into<String>, bbox: BoundingBox, confidence: f32) -> Self {
        Self {
            text: text.into(),
            bbox,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// OCR error types
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("OCR engine not available: {0}")]
    EngineUnavailable(String),

    #[error("Failed to prepare image for OCR: {0}")]
    ImageEncoding(String),

    #[error("OCR processing failed: {0}")]
    ProcessingError(String),

    #[error("OCR timed out after {0}s")]
    Timeout(u64),
}

impl OcrError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::ImageEncoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_and_intersects() {
        let a = BoundingBox::new(10, 10, 20, 10);
        let b = BoundingBox::new(25, 5, 10, 10);
        assert_eq!(a.union(&b), BoundingBox::new(10, 5, 25, 15));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&BoundingBox::new(30, 10, 5, 5)));
    }

    #[test]
    fn test_expand_clamps_to_image() {
        let bbox = BoundingBox::new(2, 50, 100, 20);
        let expanded = bbox.expand(0.2, 200, 65);
        // 10px each side horizontally, 2px vertically
        assert_eq!(expanded, BoundingBox::new(0, 48, 112, 17));
    }

    #[test]
    fn test_scale_rounds_outward() {
        let bbox = BoundingBox::new(3, 3, 3, 3);
        assert_eq!(bbox.scale(1.5), BoundingBox::new(4, 4, 5, 5));
    }

    #[test]
    fn test_clamp_outside_image_is_empty() {
        let bbox = BoundingBox::new(300, 10, 20, 20).clamp_to(100, 100);
        assert!(bbox.is_empty());
    }

    #[test]
    fn test_detection_confidence_clamped() {
        let detection = Detection::new("hi", BoundingBox::new(0, 0, 1, 1), 1.7);
        assert_eq!(detection.confidence, 1.0);
    }
}
