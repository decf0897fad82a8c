//! PDF page rasterization using MuPDF
//!
//! Pages are rendered one at a time as the iterator advances. MuPDF's
//! context is not thread-safe, so a [`PdfPages`] must stay on the thread
//! that created it; the pipeline drives it from a blocking task.

use image::{DynamicImage, RgbImage};
use mupdf::{Colorspace, Document, Matrix};

use super::types::{PageImage, UnpackError};

/// PDF user space is 72 points per inch
const POINTS_PER_INCH: f32 = 72.0;

/// Upper bound on the render scale, whatever DPI is configured
const MAX_SCALE: f32 = 8.0;

/// Lazy sequence of rendered PDF pages
pub struct PdfPages {
    doc: Document,
    page_count: usize,
    next_page: usize,
    scale: f32,
}

impl PdfPages {
    /// Open a PDF held in memory
    pub fn open(data: &[u8], dpi: f32) -> Result<Self, UnpackError> {
        let doc = Document::from_bytes(data, "application/pdf")
            .map_err(|e| UnpackError::CorruptArchive(format!("Failed to load PDF: {}", e)))?;
        let page_count = doc
            .page_count()
            .map_err(|e| UnpackError::CorruptArchive(format!("Failed to count pages: {}", e)))?
            .max(0) as usize;

        let scale = (dpi / POINTS_PER_INCH).clamp(0.1, MAX_SCALE);

        tracing::debug!(page_count, scale, "Opened PDF");

        Ok(Self {
            doc,
            page_count,
            next_page: 0,
            scale,
        })
    }

    fn render_page(&self, page_num: usize) -> Result<Option<DynamicImage>, mupdf::Error> {
        let page = self.doc.load_page(page_num as i32)?;
        let matrix = Matrix::new_scale(self.scale, self.scale);
        let colorspace = Colorspace::device_rgb();
        // No alpha: pages get an opaque white background
        let pixmap = page.to_pixmap(&matrix, &colorspace, false, true)?;
        Ok(samples_to_image(
            pixmap.width() as u32,
            pixmap.height() as u32,
            pixmap.n() as usize,
            pixmap.samples(),
        ))
    }
}

impl Iterator for PdfPages {
    type Item = PageImage;

    fn next(&mut self) -> Option<PageImage> {
        while self.next_page < self.page_count {
            let page_num = self.next_page;
            self.next_page += 1;

            match self.render_page(page_num) {
                Ok(Some(image)) => {
                    return Some(PageImage {
                        index: page_num,
                        name: format!("page_{}", page_num + 1),
                        image,
                    })
                }
                Ok(None) => {
                    tracing::warn!(page = page_num + 1, "Skipping PDF page with malformed pixmap");
                }
                Err(e) => {
                    tracing::warn!(page = page_num + 1, "Skipping unreadable PDF page: {}", e);
                }
            }
        }
        None
    }
}

/// Convert packed pixmap samples with `n` components per pixel to RGB
///
/// `None` when the buffer is too short for the stated size.
fn samples_to_image(width: u32, height: u32, n: usize, samples: &[u8]) -> Option<DynamicImage> {
    if n == 0 {
        return None;
    }
    let pixels = (width as usize).checked_mul(height as usize)?;
    if samples.len() < pixels.checked_mul(n)? {
        return None;
    }

    let mut rgb_buffer = Vec::with_capacity(pixels.checked_mul(3)?);
    for pixel in samples.chunks_exact(n).take(pixels) {
        // Single-channel pixmaps are gray
        let (r, g, b) = if n >= 3 {
            (pixel[0], pixel[1], pixel[2])
        } else {
            (pixel[0], pixel[0], pixel[0])
        };
        rgb_buffer.extend_from_slice(&[r, g, b]);
    }

    RgbImage::from_raw(width, height, rgb_buffer).map(DynamicImage::ImageRgb8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_yields_no_pages() {
        // MuPDF may reject the buffer outright or repair it into an empty document
        match PdfPages::open(b"this is not a pdf at all", 150.0) {
            Err(UnpackError::CorruptArchive(_)) => {}
            Ok(pages) => assert_eq!(pages.count(), 0),
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_samples_to_image_rgb() {
        let samples = [255, 0, 0, 0, 255, 0, 0, 0, 255, 10, 20, 30];
        let image = samples_to_image(2, 2, 3, &samples).unwrap().to_rgb8();
        assert_eq!(image.dimensions(), (2, 2));
        assert_eq!(image.get_pixel(1, 0).0, [0, 255, 0]);
        assert_eq!(image.get_pixel(1, 1).0, [10, 20, 30]);
    }

    #[test]
    fn test_samples_to_image_drops_alpha() {
        let samples = [1, 2, 3, 255, 4, 5, 6, 0];
        let image = samples_to_image(2, 1, 4, &samples).unwrap().to_rgb8();
        assert_eq!(image.into_raw(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_samples_to_image_gray() {
        let image = samples_to_image(2, 1, 1, &[40, 200]).unwrap().to_rgb8();
        assert_eq!(image.get_pixel(0, 0).0, [40, 40, 40]);
        assert_eq!(image.get_pixel(1, 0).0, [200, 200, 200]);
    }

    #[test]
    fn test_short_samples_are_rejected() {
        // A malformed pixmap must not turn into a black page
        assert!(samples_to_image(4, 4, 3, &[0u8; 20]).is_none());
        assert!(samples_to_image(2, 2, 0, &[]).is_none());
    }

    #[test]
    fn test_huge_dimensions_do_not_overflow() {
        assert!(samples_to_image(u32::MAX, u32::MAX, 3, &[0u8; 12]).is_none());
    }
}
