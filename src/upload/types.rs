//! Upload types

use axum::body::Bytes;
use serde::Serialize;

// ============================================================================
// Upload Kinds
// ============================================================================

/// Raster formats accepted as single-image uploads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Png,
    Jpeg,
    Webp,
    Bmp,
    Tiff,
    Gif,
}

impl ImageKind {
    /// Decoder format for this kind
    pub fn image_format(self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Webp => image::ImageFormat::WebP,
            Self::Bmp => image::ImageFormat::Bmp,
            Self::Tiff => image::ImageFormat::Tiff,
            Self::Gif => image::ImageFormat::Gif,
        }
    }
}

/// Container formats holding several images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveKind {
    /// ZIP and CBZ
    Zip,
    /// RAR and CBR
    Rar,
}

/// What an upload contains, resolved once by the validator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "format", rename_all = "lowercase")]
pub enum UploadKind {
    Image(ImageKind),
    Pdf,
    Archive(ArchiveKind),
}

impl UploadKind {
    /// Detect kind from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Image(ImageKind::Png)),
            "jpg" | "jpeg" => Some(Self::Image(ImageKind::Jpeg)),
            "webp" => Some(Self::Image(ImageKind::Webp)),
            "bmp" => Some(Self::Image(ImageKind::Bmp)),
            "tif" | "tiff" => Some(Self::Image(ImageKind::Tiff)),
            "gif" => Some(Self::Image(ImageKind::Gif)),
            "pdf" => Some(Self::Pdf),
            "zip" | "cbz" => Some(Self::Archive(ArchiveKind::Zip)),
            "rar" | "cbr" => Some(Self::Archive(ArchiveKind::Rar)),
            _ => None,
        }
    }

    /// Detect kind from a declared MIME type
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_lowercase();
        match essence.as_str() {
            "image/png" => Some(Self::Image(ImageKind::Png)),
            "image/jpeg" | "image/jpg" => Some(Self::Image(ImageKind::Jpeg)),
            "image/webp" => Some(Self::Image(ImageKind::Webp)),
            "image/bmp" | "image/x-bmp" => Some(Self::Image(ImageKind::Bmp)),
            "image/tiff" => Some(Self::Image(ImageKind::Tiff)),
            "image/gif" => Some(Self::Image(ImageKind::Gif)),
            "application/pdf" => Some(Self::Pdf),
            "application/zip"
            | "application/x-zip-compressed"
            | "application/vnd.comicbook+zip"
            | "application/x-cbz" => Some(Self::Archive(ArchiveKind::Zip)),
            "application/vnd.rar"
            | "application/x-rar-compressed"
            | "application/vnd.comicbook-rar"
            | "application/x-cbr" => Some(Self::Archive(ArchiveKind::Rar)),
            _ => None,
        }
    }

    /// Detect kind from magic bytes
    pub fn from_magic_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 {
            return None;
        }

        if bytes.starts_with(b"\x89PNG") {
            return Some(Self::Image(ImageKind::Png));
        }
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Image(ImageKind::Jpeg));
        }
        if bytes.starts_with(b"GIF8") {
            return Some(Self::Image(ImageKind::Gif));
        }
        if bytes.starts_with(b"BM") {
            return Some(Self::Image(ImageKind::Bmp));
        }
        if bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*") {
            return Some(Self::Image(ImageKind::Tiff));
        }
        if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
            return Some(Self::Image(ImageKind::Webp));
        }
        if bytes.starts_with(b"%PDF") {
            return Some(Self::Pdf);
        }
        // Local file header or end-of-central-directory of an empty archive
        if bytes.starts_with(b"PK\x03\x04") || bytes.starts_with(b"PK\x05\x06") {
            return Some(Self::Archive(ArchiveKind::Zip));
        }
        if bytes.starts_with(b"Rar!\x1a\x07") {
            return Some(Self::Archive(ArchiveKind::Rar));
        }

        None
    }

    /// Whether the upload may yield more than one page
    pub fn is_multi_page(&self) -> bool {
        !matches!(self, Self::Image(_))
    }
}

// ============================================================================
// Uploaded Files
// ============================================================================

/// A file received in a multipart request
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Declared file name
    pub file_name: String,
    /// Declared MIME type
    pub content_type: Option<String>,
    /// Raw content
    pub data: Bytes,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, content_type: Option<String>, data: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            data,
        }
    }

    /// Size in bytes
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Lowercase extension of the declared name, if any
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
    }

    /// File name without directories or extension
    pub fn stem(&self) -> String {
        std::path::Path::new(&self.file_name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .unwrap_or("upload")
            .to_string()
    }
}

/// An upload that passed validation
#[derive(Debug, Clone)]
pub struct ValidatedUpload {
    pub file: UploadedFile,
    pub kind: UploadKind,
}

// ============================================================================
// Error Types
// ============================================================================

/// Upload validation errors
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("No file provided")]
    MissingFile,

    #[error("File too large: {size} bytes (max: {max})")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Too many files: {count} (max: {max})")]
    TooManyFiles { count: usize, max: usize },
}

impl UploadError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::MissingFile | Self::UnsupportedFormat(_) | Self::TooManyFiles { .. } => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(
            UploadKind::from_extension("JPG"),
            Some(UploadKind::Image(ImageKind::Jpeg))
        );
        assert_eq!(
            UploadKind::from_extension("cbz"),
            Some(UploadKind::Archive(ArchiveKind::Zip))
        );
        assert_eq!(
            UploadKind::from_extension("cbr"),
            Some(UploadKind::Archive(ArchiveKind::Rar))
        );
        assert_eq!(UploadKind::from_extension("docx"), None);
    }

    #[test]
    fn test_kind_from_mime_ignores_parameters() {
        assert_eq!(
            UploadKind::from_mime("image/png; charset=binary"),
            Some(UploadKind::Image(ImageKind::Png))
        );
        assert_eq!(UploadKind::from_mime("application/pdf"), Some(UploadKind::Pdf));
        assert_eq!(
            UploadKind::from_mime(
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            ),
            None
        );
    }

    #[test]
    fn test_kind_from_magic_bytes() {
        assert_eq!(
            UploadKind::from_magic_bytes(b"\x89PNG\r\n\x1a\n"),
            Some(UploadKind::Image(ImageKind::Png))
        );
        assert_eq!(UploadKind::from_magic_bytes(b"%PDF-1.7"), Some(UploadKind::Pdf));
        assert_eq!(
            UploadKind::from_magic_bytes(b"RIFF\0\0\0\0WEBPVP8 "),
            Some(UploadKind::Image(ImageKind::Webp))
        );
        assert_eq!(
            UploadKind::from_magic_bytes(b"Rar!\x1a\x07\x01\x00"),
            Some(UploadKind::Archive(ArchiveKind::Rar))
        );
        assert_eq!(UploadKind::from_magic_bytes(b"abc"), None);
    }

    #[test]
    fn test_uploaded_file_names() {
        let file = UploadedFile::new("scans/Chapter 1.CBZ", None, Bytes::new());
        assert_eq!(file.extension().as_deref(), Some("cbz"));
        assert_eq!(file.stem(), "Chapter 1");

        let unnamed = UploadedFile::new(".png", None, Bytes::new());
        assert_eq!(unnamed.stem(), ".png");
    }
}
