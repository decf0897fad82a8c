//! Upload validation
//!
//! Checks size and format of an upload and resolves it to an [`UploadKind`].

use crate::config::UploadConfig;

use super::types::{UploadError, UploadKind, UploadedFile, ValidatedUpload};

/// Validates uploads against the size limit and the format allow-list
#[derive(Debug, Clone)]
pub struct FileValidator {
    max_file_size: u64,
    supported_formats: Vec<String>,
}

impl FileValidator {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            max_file_size: config.max_file_size,
            supported_formats: config
                .supported_formats
                .iter()
                .map(|ext| ext.to_lowercase())
                .collect(),
        }
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    pub fn supported_formats(&self) -> &[String] {
        &self.supported_formats
    }

    /// Validate an upload
    ///
    /// The kind is taken from the extension when it has a known one, then
    /// from the declared MIME type, then from the content's magic bytes.
    pub fn validate(&self, file: UploadedFile) -> Result<ValidatedUpload, UploadError> {
        if file.file_name.trim().is_empty() {
            return Err(UploadError::MissingFile);
        }

        self.check_size(file.size())?;

        let kind = self.resolve_kind(&file)?;

        tracing::debug!(
            file_name = %file.file_name,
            size = file.size(),
            kind = ?kind,
            "Upload validated"
        );

        Ok(ValidatedUpload { file, kind })
    }

    /// Check a size against the limit (inclusive)
    pub fn check_size(&self, size: u64) -> Result<(), UploadError> {
        if size > self.max_file_size {
            return Err(UploadError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }
        Ok(())
    }

    fn resolve_kind(&self, file: &UploadedFile) -> Result<UploadKind, UploadError> {
        if let Some(ext) = file.extension() {
            if let Some(kind) = UploadKind::from_extension(&ext) {
                if self.supported_formats.contains(&ext) {
                    return Ok(kind);
                }
                return Err(UploadError::UnsupportedFormat(format!(
                    ".{} uploads are disabled",
                    ext
                )));
            }
        }

        let kind = file
            .content_type
            .as_deref()
            .and_then(UploadKind::from_mime)
            .or_else(|| {
                // Only sniff content when nothing was declared about it
                if file.extension().is_none() {
                    UploadKind::from_magic_bytes(&file.data)
                } else {
                    None
                }
            })
            .ok_or_else(|| UploadError::UnsupportedFormat(describe(file)))?;

        if self.kind_enabled(kind) {
            Ok(kind)
        } else {
            Err(UploadError::UnsupportedFormat(describe(file)))
        }
    }

    fn kind_enabled(&self, kind: UploadKind) -> bool {
        self.supported_formats
            .iter()
            .any(|ext| UploadKind::from_extension(ext) == Some(kind))
    }
}

fn describe(file: &UploadedFile) -> String {
    match (file.extension(), file.content_type.as_deref()) {
        (Some(ext), _) => format!(".{}", ext),
        (None, Some(mime)) => mime.to_string(),
        (None, None) => file.file_name.clone(),
    }
}
