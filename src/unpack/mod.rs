//! Unpacking Module
//!
//! Turns a validated upload into an ordered, lazy sequence of page images:
//! - Single images decode to one page
//! - PDFs are rasterized page by page with MuPDF
//! - ZIP/CBZ and RAR/CBR archives yield their image entries in listing order
//!
//! ## Usage
//!
//! ```rust,ignore
//! let unpacker = ArchiveUnpacker::new(&config.upload);
//! let mut pages = unpacker.open(&upload, &workspace)?;
//! for page in pages.by_ref() {
//!     // ...
//! }
//! pages.finish()?; // fails when nothing usable was found
//! ```

mod archive;
mod pdf;
mod types;

pub use archive::{ZipPages, MAX_ENTRY_SIZE};
#[cfg(feature = "rar")]
pub use archive::RarPages;
pub use pdf::PdfPages;
pub use types::{is_image_entry, PageImage, UnpackError};

use crate::config::UploadConfig;
use crate::upload::{ArchiveKind, ImageKind, RequestWorkspace, UploadKind, ValidatedUpload};

/// Produces page sequences for validated uploads
#[derive(Debug, Clone)]
pub struct ArchiveUnpacker {
    pdf_dpi: f32,
    max_pages: usize,
}

impl ArchiveUnpacker {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            pdf_dpi: config.pdf_dpi,
            max_pages: config.max_pages,
        }
    }

    /// Open the page sequence of an upload
    ///
    /// Fails only when the container itself cannot be read. The returned
    /// sequence is consumed once; it is not `Send` for PDFs and must stay on
    /// the thread that opened it.
    pub fn open(
        &self,
        upload: &ValidatedUpload,
        workspace: &RequestWorkspace,
    ) -> Result<Pages, UnpackError> {
        let source = match upload.kind {
            UploadKind::Image(kind) => {
                let image = decode_single(&upload.file.data, kind)?;
                PageSource::Single(Some(PageImage {
                    index: 0,
                    name: upload.file.file_name.clone(),
                    image,
                }))
            }
            UploadKind::Pdf => PageSource::Pdf(PdfPages::open(&upload.file.data, self.pdf_dpi)?),
            UploadKind::Archive(ArchiveKind::Zip) => {
                PageSource::Zip(ZipPages::open(upload.file.data.clone())?)
            }
            UploadKind::Archive(ArchiveKind::Rar) => open_rar(upload, workspace)?,
        };

        Ok(Pages {
            source,
            yielded: 0,
            max_pages: self.max_pages,
            limit_reported: false,
            label: upload.file.file_name.clone(),
        })
    }
}

#[cfg(feature = "rar")]
fn open_rar(upload: &ValidatedUpload, workspace: &RequestWorkspace) -> Result<PageSource, UnpackError> {
    let path = workspace.write_file(&format!("input_{}", upload.file.file_name), &upload.file.data)?;
    Ok(PageSource::Rar(RarPages::open(&path)?))
}

#[cfg(not(feature = "rar"))]
fn open_rar(_upload: &ValidatedUpload, _workspace: &RequestWorkspace) -> Result<PageSource, UnpackError> {
    Err(UnpackError::UnsupportedFormat(
        "RAR support is not enabled in this build".to_string(),
    ))
}

fn decode_single(data: &[u8], kind: ImageKind) -> Result<image::DynamicImage, UnpackError> {
    image::load_from_memory_with_format(data, kind.image_format())
        .or_else(|_| image::load_from_memory(data))
        .map_err(|e| UnpackError::UnsupportedFormat(format!("Could not decode image: {}", e)))
}

enum PageSource {
    Single(Option<PageImage>),
    Pdf(PdfPages),
    Zip(ZipPages),
    #[cfg(feature = "rar")]
    Rar(RarPages),
}

/// Lazy, finite, non-restartable sequence of pages from one upload
pub struct Pages {
    source: PageSource,
    yielded: usize,
    max_pages: usize,
    limit_reported: bool,
    label: String,
}

impl Pages {
    /// Close the sequence, failing when it produced no page at all
    pub fn finish(self) -> Result<usize, UnpackError> {
        if self.yielded == 0 {
            return Err(UnpackError::UnsupportedEntry(format!(
                "{} contains no readable images",
                self.label
            )));
        }
        Ok(self.yielded)
    }

    /// Drain the sequence into memory
    pub fn collect_all(mut self) -> Result<Vec<PageImage>, UnpackError> {
        let pages: Vec<PageImage> = self.by_ref().collect();
        self.finish()?;
        Ok(pages)
    }
}

impl Iterator for Pages {
    type Item = PageImage;

    fn next(&mut self) -> Option<PageImage> {
        if self.yielded >= self.max_pages {
            if !self.limit_reported {
                tracing::warn!(
                    file_name = %self.label,
                    max_pages = self.max_pages,
                    "Page limit reached, ignoring remaining pages"
                );
                self.limit_reported = true;
            }
            return None;
        }

        let page = match &mut self.source {
            PageSource::Single(page) => page.take(),
            PageSource::Pdf(pages) => pages.next(),
            PageSource::Zip(pages) => pages.next(),
            #[cfg(feature = "rar")]
            PageSource::Rar(pages) => pages.next(),
        }?;

        self.yielded += 1;
        Some(page)
    }
}
