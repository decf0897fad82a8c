//! Text removal by inpainting
//!
//! The boxes are rasterized into a mask and handed to OpenCV's
//! fast-marching (Telea) inpainting. Only masked pixels are rewritten.

use image::{DynamicImage, GrayImage, Luma, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use opencv::core::{Mat, Scalar, CV_8UC1, CV_8UC3};
use opencv::photo::{self, INPAINT_TELEA};
use opencv::prelude::*;

use super::ImagingError;
use crate::ocr::BoundingBox;

/// Erases regions of an image
pub trait Inpainter: Send + Sync {
    /// Return `image` with every box erased and reconstructed from its
    /// surroundings; dimensions and pixels outside the boxes are unchanged
    fn inpaint(&self, image: &DynamicImage, boxes: &[BoundingBox]) -> Result<DynamicImage, ImagingError>;
}

/// OpenCV Telea inpainting
#[derive(Debug, Clone)]
pub struct FastMarchingInpainter {
    /// Neighbourhood considered for each reconstructed pixel
    radius: u32,
}

impl FastMarchingInpainter {
    pub fn new(radius: u32) -> Self {
        Self {
            radius: radius.max(1),
        }
    }

    /// Mask of the pixels to reconstruct: exactly the boxes, clamped to the
    /// image
    pub fn build_mask(&self, width: u32, height: u32, boxes: &[BoundingBox]) -> GrayImage {
        let mut mask = GrayImage::new(width, height);
        for bbox in boxes {
            let bbox = bbox.clamp_to(width, height);
            if bbox.is_empty() {
                continue;
            }
            let rect = Rect::at(bbox.x as i32, bbox.y as i32).of_size(bbox.width, bbox.height);
            draw_filled_rect_mut(&mut mask, rect, Luma([255u8]));
        }
        mask
    }
}

impl Inpainter for FastMarchingInpainter {
    fn inpaint(&self, image: &DynamicImage, boxes: &[BoundingBox]) -> Result<DynamicImage, ImagingError> {
        let (width, height) = (image.width(), image.height());
        let mask = self.build_mask(width, height, boxes);

        let masked = mask.pixels().filter(|p| p.0[0] != 0).count();
        if masked == 0 {
            return Ok(image.clone());
        }
        if masked == mask.len() {
            return Err(ImagingError::Inpainting(
                "text covers the whole image, nothing to sample from".to_string(),
            ));
        }

        let src = rgb_to_mat(&image.to_rgb8()).map_err(opencv_error)?;
        let mask_mat = gray_to_mat(&mask).map_err(opencv_error)?;

        let mut dst = Mat::default();
        photo::inpaint(&src, &mask_mat, &mut dst, self.radius as f64, INPAINT_TELEA).map_err(opencv_error)?;

        let filled = mat_to_rgb(&dst, width, height).map_err(opencv_error)?;

        if !image.color().has_alpha() {
            return Ok(DynamicImage::ImageRgb8(filled));
        }

        // Transparency is kept as it was
        let mut rgba = image.to_rgba8();
        for (out, rgb) in rgba.pixels_mut().zip(filled.pixels()) {
            out.0[..3].copy_from_slice(&rgb.0);
        }
        Ok(DynamicImage::ImageRgba8(rgba))
    }
}

fn opencv_error(e: opencv::Error) -> ImagingError {
    ImagingError::Inpainting(format!("OpenCV: {}", e))
}

fn rgb_to_mat(image: &RgbImage) -> opencv::Result<Mat> {
    let mut mat = Mat::new_rows_cols_with_default(
        image.height() as i32,
        image.width() as i32,
        CV_8UC3,
        Scalar::all(0.0),
    )?;
    // Channel order does not matter to inpainting, RGB stays RGB
    mat.data_bytes_mut()?.copy_from_slice(image.as_raw());
    Ok(mat)
}

fn gray_to_mat(image: &GrayImage) -> opencv::Result<Mat> {
    let mut mat = Mat::new_rows_cols_with_default(
        image.height() as i32,
        image.width() as i32,
        CV_8UC1,
        Scalar::all(0.0),
    )?;
    for (x, y, pixel) in image.enumerate_pixels() {
        *mat.at_2d_mut::<u8>(y as i32, x as i32)? = pixel.0[0];
    }
    Ok(mat)
}

fn mat_to_rgb(mat: &Mat, width: u32, height: u32) -> opencv::Result<RgbImage> {
    let data = mat.data_bytes()?.to_vec();
    RgbImage::from_raw(width, height, data).ok_or_else(|| {
        opencv::Error::new(
            opencv::core::StsUnmatchedSizes,
            format!("inpainted image is not {}x{} RGB", width, height),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba, RgbaImage};

    fn inside(x: u32, y: u32, bbox: &BoundingBox) -> bool {
        x >= bbox.x && x < bbox.right() && y >= bbox.y && y < bbox.bottom()
    }

    #[test]
    fn test_mask_matches_boxes_exactly() {
        let inpainter = FastMarchingInpainter::new(3);
        let bbox = BoundingBox::new(5, 5, 3, 3);
        let mask = inpainter.build_mask(20, 20, &[bbox, BoundingBox::new(18, 18, 10, 10)]);

        for (x, y, pixel) in mask.enumerate_pixels() {
            let expected = inside(x, y, &bbox) || (x >= 18 && y >= 18);
            assert_eq!(pixel.0[0] == 255, expected, "mask wrong at ({}, {})", x, y);
        }
    }

    #[test]
    fn test_text_on_uniform_background_disappears() {
        let mut img = RgbImage::from_pixel(40, 30, Rgb([200, 180, 160]));
        // "Text" strokes
        for x in 12..28 {
            for y in 12..16 {
                img.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }
        let image = DynamicImage::ImageRgb8(img);

        let result = FastMarchingInpainter::new(3)
            .inpaint(&image, &[BoundingBox::new(10, 10, 20, 8)])
            .unwrap();

        assert_eq!(result.width(), 40);
        assert_eq!(result.height(), 30);
        for pixel in result.to_rgb8().pixels() {
            for (channel, expected) in pixel.0.iter().zip([200u8, 180, 160]) {
                assert!(channel.abs_diff(expected) <= 2, "{:?}", pixel.0);
            }
        }
    }

    #[test]
    fn test_pixels_outside_boxes_are_untouched() {
        // A thin outline just left of the box, like a speech bubble border
        let mut img = RgbImage::from_pixel(40, 30, Rgb([255, 255, 255]));
        for y in 0..30 {
            img.put_pixel(8, y, Rgb([0, 0, 0]));
        }
        for x in 12..28 {
            img.put_pixel(x, 13, Rgb([0, 0, 0]));
        }
        let image = DynamicImage::ImageRgb8(img.clone());
        let bbox = BoundingBox::new(10, 10, 20, 8);

        let result = FastMarchingInpainter::new(3).inpaint(&image, &[bbox]).unwrap().to_rgb8();

        for (x, y, pixel) in result.enumerate_pixels() {
            if !inside(x, y, &bbox) {
                assert_eq!(pixel, img.get_pixel(x, y), "pixel ({}, {}) changed", x, y);
            }
        }
    }

    #[test]
    fn test_alpha_is_preserved() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_fn(20, 20, |x, _| {
            Rgba([120, 120, 120, if x < 10 { 255 } else { 40 }])
        }));
        let result = FastMarchingInpainter::new(3)
            .inpaint(&image, &[BoundingBox::new(5, 5, 10, 4)])
            .unwrap();

        assert!(result.color().has_alpha());
        let rgba = result.to_rgba8();
        assert_eq!(rgba.get_pixel(6, 6).0[3], 255);
        assert_eq!(rgba.get_pixel(12, 6).0[3], 40);
    }

    #[test]
    fn test_no_boxes_is_identity() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_fn(8, 8, |x, y| Rgb([x as u8, y as u8, 7])));
        let result = FastMarchingInpainter::new(3).inpaint(&image, &[]).unwrap();
        assert_eq!(result.to_rgb8().into_raw(), image.to_rgb8().into_raw());
    }

    #[test]
    fn test_full_cover_fails() {
        let image = DynamicImage::new_rgb8(10, 10);
        let result = FastMarchingInpainter::new(3).inpaint(&image, &[BoundingBox::new(0, 0, 10, 10)]);
        assert!(matches!(result, Err(ImagingError::Inpainting(_))));
    }
}
