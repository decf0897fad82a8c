//! OCR Providers
//!
//! Defines the detector trait and the Tesseract implementation.

use std::collections::HashMap;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::types::{BoundingBox, Detection, OcrError};

/// Text detection backend
#[async_trait]
pub trait TextDetector: Send + Sync {
    /// Short backend name for logs and health output
    fn name(&self) -> &'static str;

    /// Check if the backend can be used
    async fn is_available(&self) -> bool;

    /// Detect text lines in an encoded image, in reading order
    async fn detect(&self, image_data: &[u8]) -> Result<Vec<Detection>, OcrError>;
}

/// Map an ISO 639-1 code to its Tesseract traineddata name
pub fn tesseract_language(code: &str) -> Option<&'static str> {
    match code.to_lowercase().as_str() {
        "en" => Some("eng"),
        "ar" => Some("ara"),
        "fr" => Some("fra"),
        "es" => Some("spa"),
        "de" => Some("deu"),
        "it" => Some("ita"),
        "pt" => Some("por"),
        "ru" => Some("rus"),
        "ja" => Some("jpn"),
        "ko" => Some("kor"),
        "zh" => Some("chi_sim"),
        _ => None,
    }
}

// ============================================================================
// Tesseract
// ============================================================================

/// Tesseract OCR provider driving the `tesseract` binary
pub struct TesseractProvider {
    binary: String,
    /// `+`-joined Tesseract language list
    languages: String,
}

impl TesseractProvider {
    pub fn new(binary: &str, languages: &[String]) -> Self {
        let mut codes: Vec<&str> = Vec::new();
        for language in languages {
            match tesseract_language(language) {
                Some(code) if !codes.contains(&code) => codes.push(code),
                Some(_) => {}
                None => tracing::warn!("No Tesseract model for language {:?}, ignoring", language),
            }
        }
        if codes.is_empty() {
            codes.push("eng");
        }

        Self {
            binary: binary.to_string(),
            languages: codes.join("+"),
        }
    }

    pub fn languages(&self) -> &str {
        &self.languages
    }
}

#[async_trait]
impl TextDetector for TesseractProvider {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    async fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }

    async fn detect(&self, image_data: &[u8]) -> Result<Vec<Detection>, OcrError> {
        let mut child = Command::new(&self.binary)
            .args(["stdin", "stdout", "-l", &self.languages, "--psm", "3", "tsv"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| OcrError::EngineUnavailable(format!("Failed to run tesseract: {}", e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(image_data)
                .await
                .map_err(|e| OcrError::ProcessingError(format!("Failed to send image: {}", e)))?;
            // Closing stdin signals end of input
            drop(stdin);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| OcrError::ProcessingError(format!("Failed to read tesseract output: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::ProcessingError(format!(
                "Tesseract failed: {}",
                stderr.trim()
            )));
        }

        Ok(parse_tsv(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Group word rows of Tesseract TSV output into line detections
///
/// Lines keep the order of their first word. The box is the union of the
/// word boxes and the confidence the mean word confidence, scaled to `[0, 1]`.
pub fn parse_tsv(tsv: &str) -> Vec<Detection> {
    struct Line {
        words: Vec<String>,
        bbox: BoundingBox,
        confidence_sum: f32,
    }

    let mut lines: Vec<Line> = Vec::new();
    let mut index: HashMap<(u32, u32, u32, u32), usize> = HashMap::new();

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.splitn(12, '\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }

        let text = cols[11].trim();
        let confidence: f32 = match cols[10].trim().parse() {
            Ok(c) if c >= 0.0 => c,
            _ => continue,
        };
        if text.is_empty() {
            continue;
        }

        let nums: Option<Vec<u32>> = cols[1..10].iter().map(|c| c.trim().parse().ok()).collect();
        let Some(nums) = nums else {
            continue;
        };
        let key = (nums[0], nums[1], nums[2], nums[3]);
        let bbox = BoundingBox::new(nums[5], nums[6], nums[7], nums[8]);

        match index.get(&key) {
            Some(&i) => {
                let line = &mut lines[i];
                line.words.push(text.to_string());
                line.bbox = line.bbox.union(&bbox);
                line.confidence_sum += confidence;
            }
            None => {
                index.insert(key, lines.len());
                lines.push(Line {
                    words: vec![text.to_string()],
                    bbox,
                    confidence_sum: confidence,
                });
            }
        }
    }

    lines
        .into_iter()
        .map(|line| {
            let mean = line.confidence_sum / line.words.len() as f32;
            Detection::new(line.words.join(" "), line.bbox, mean / 100.0)
        })
        .collect()
}
