//! OCR Module
//!
//! Locates text in page images.
//!
//! The default backend is the Tesseract CLI; anything implementing
//! [`TextDetector`] can be plugged in instead.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use arabic_image_translator::ocr::{TesseractProvider, TextExtractor, TextExtractorConfig};
//!
//! let detector = Arc::new(TesseractProvider::new("tesseract", &config.ocr.languages));
//! let extractor = TextExtractor::new(TextExtractorConfig::from(&config.ocr), detector);
//!
//! let detections = extractor.extract(&page.image).await?;
//! ```

mod provider;
mod service;
mod types;

pub use provider::{parse_tsv, tesseract_language, TesseractProvider, TextDetector};
pub use service::{TextExtractor, TextExtractorConfig};
pub use types::{BoundingBox, Detection, OcrError};
