//! Unpacking types

use image::DynamicImage;

/// One raster page taken from an upload
#[derive(Debug, Clone)]
pub struct PageImage {
    /// Position in the upload (0-based), fixes the output order
    pub index: usize,
    /// Page label or archive entry name
    pub name: String,
    pub image: DynamicImage,
}

impl PageImage {
    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

/// Unpacking errors
#[derive(Debug, thiserror::Error)]
pub enum UnpackError {
    #[error("Corrupt archive: {0}")]
    CorruptArchive(String),

    #[error("No usable image entries: {0}")]
    UnsupportedEntry(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl UnpackError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// Whether an archive entry name looks like a raster image
pub fn is_image_entry(name: &str) -> bool {
    let file_name = name.rsplit(['/', '\\']).next().unwrap_or(name);
    if file_name.starts_with('.') || name.starts_with("__MACOSX/") {
        return false;
    }
    mime_guess::from_path(file_name)
        .first_raw()
        .map(|mime| mime.starts_with("image/") && mime != "image/svg+xml")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_image_entry() {
        assert!(is_image_entry("chapter1/001.jpg"));
        assert!(is_image_entry("PAGE.PNG"));
        assert!(is_image_entry("scan.webp"));
        assert!(!is_image_entry("ComicInfo.xml"));
        assert!(!is_image_entry("chapter1/"));
        assert!(!is_image_entry("__MACOSX/._001.jpg"));
        assert!(!is_image_entry("chapter1/.thumb.png"));
        assert!(!is_image_entry("logo.svg"));
    }
}
