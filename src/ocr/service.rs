//! OCR Service
//!
//! Prepares page images for the detector and filters what comes back.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use image::DynamicImage;

use super::{
    provider::TextDetector,
    types::{Detection, OcrError},
};
use crate::config::OcrConfig;

/// Text extraction settings
#[derive(Debug, Clone)]
pub struct TextExtractorConfig {
    pub confidence_threshold: f32,
    pub max_image_dimension: u32,
    pub min_text_length: usize,
    pub timeout: Duration,
}

impl From<&OcrConfig> for TextExtractorConfig {
    fn from(config: &OcrConfig) -> Self {
        Self {
            confidence_threshold: config.confidence_threshold,
            max_image_dimension: config.max_image_dimension,
            min_text_length: config.min_text_length,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

/// Runs a [`TextDetector`] over page images
pub struct TextExtractor {
    config: TextExtractorConfig,
    detector: Arc<dyn TextDetector>,
}

impl TextExtractor {
    pub fn new(config: TextExtractorConfig, detector: Arc<dyn TextDetector>) -> Self {
        Self { config, detector }
    }

    pub fn detector_name(&self) -> &'static str {
        self.detector.name()
    }

    pub async fn is_available(&self) -> bool {
        self.detector.is_available().await
    }

    /// Detect text in an image
    ///
    /// Returned boxes are in the coordinates of `image` and lie within it.
    /// Detections under the confidence threshold or shorter than the
    /// minimum text length are dropped.
    pub async fn extract(&self, image: &DynamicImage) -> Result<Vec<Detection>, OcrError> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }

        let prepared = image.clone();
        let max_dimension = self.config.max_image_dimension;
        let (encoded, scale) = tokio::task::spawn_blocking(move || prepare_image(prepared, max_dimension))
            .await
            .map_err(|e| OcrError::ImageEncoding(format!("Task failed: {}", e)))??;

        let raw = tokio::time::timeout(self.config.timeout, self.detector.detect(&encoded))
            .await
            .map_err(|_| OcrError::Timeout(self.config.timeout.as_secs()))??;

        let total = raw.len();
        let detections: Vec<Detection> = raw
            .into_iter()
            .filter_map(|mut detection| {
                if detection.confidence < self.config.confidence_threshold {
                    return None;
                }
                let text = detection.text.trim();
                if text.chars().count() < self.config.min_text_length {
                    return None;
                }
                detection.text = text.to_string();
                detection.bbox = detection.bbox.scale(scale).clamp_to(width, height);
                (!detection.bbox.is_empty()).then_some(detection)
            })
            .collect();

        tracing::debug!(
            detector = self.detector.name(),
            total,
            kept = detections.len(),
            "Text extraction finished"
        );

        Ok(detections)
    }
}

/// Downscale so neither side exceeds `max_dimension` and encode as PNG
///
/// Returns the encoded image and the factor mapping its coordinates back to
/// the original image.
fn prepare_image(image: DynamicImage, max_dimension: u32) -> Result<(Vec<u8>, f32), OcrError> {
    let longest = image.width().max(image.height());
    let (image, scale) = if max_dimension > 0 && longest > max_dimension {
        let resized = image.resize(
            max_dimension,
            max_dimension,
            image::imageops::FilterType::Triangle,
        );
        let factor = image.width() as f32 / resized.width().max(1) as f32;
        (resized, factor)
    } else {
        (image, 1.0)
    };

    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
        .map_err(|e| OcrError::ImageEncoding(format!("Failed to encode image: {}", e)))?;

    Ok((buffer, scale))
}
