//! Arabic text rendering
//!
//! Each text is fitted into its box at the largest font size that holds the
//! greedily wrapped lines, drawn centered on a box-sized layer and
//! composited onto the page.

use std::path::Path;

use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use image::{imageops, DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};

use super::shaping::shape_line;
use super::{ImagingError, TextPlacement};
use crate::ocr::BoundingBox;

/// Draws translated text into boxes
pub trait TextRenderer: Send + Sync {
    /// Return `image` with every placement drawn inside its box; dimensions
    /// are unchanged
    fn render(&self, image: &DynamicImage, placements: &[TextPlacement]) -> Result<DynamicImage, ImagingError>;
}

/// Lines chosen for one box
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub font_size: f32,
    /// Shaped lines in visual order, top to bottom
    pub lines: Vec<String>,
    pub line_height: f32,
    /// Whether the layout fits the box without clipping
    pub fits: bool,
}

/// Renders shaped right-to-left text with a single font
pub struct ArabicRenderer {
    font: FontArc,
    min_font_size: f32,
    max_font_size: f32,
}

impl ArabicRenderer {
    pub fn new(font: FontArc, min_font_size: f32, max_font_size: f32) -> Self {
        Self {
            font,
            min_font_size: min_font_size.max(1.0),
            max_font_size: max_font_size.max(min_font_size.max(1.0)),
        }
    }

    /// Load the font once at startup
    pub fn from_file(path: &Path, min_font_size: f32, max_font_size: f32) -> Result<Self, ImagingError> {
        let data = std::fs::read(path)
            .map_err(|e| ImagingError::FontLoad(format!("{}: {}", path.display(), e)))?;
        let font = FontArc::try_from_vec(data)
            .map_err(|_| ImagingError::FontLoad(format!("{}: not a usable font", path.display())))?;

        tracing::info!(font = %path.display(), "Loaded rendering font");
        Ok(Self::new(font, min_font_size, max_font_size))
    }

    fn line_height(&self, size: f32) -> f32 {
        let scaled = self.font.as_scaled(PxScale::from(size));
        scaled.height() + scaled.line_gap()
    }

    fn line_width(&self, size: f32, line: &str) -> u32 {
        text_size(PxScale::from(size), &self.font, line).0
    }

    /// Greedy word wrap at one size; `None` when a single word is wider
    /// than the box
    fn wrap(&self, text: &str, size: f32, max_width: u32) -> Option<Vec<String>> {
        let mut lines: Vec<String> = Vec::new();
        let mut current = String::new();

        for word in text.split_whitespace() {
            if self.line_width(size, &shape_line(word)) > max_width {
                return None;
            }

            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };

            if self.line_width(size, &shape_line(&candidate)) <= max_width {
                current = candidate;
            } else {
                lines.push(std::mem::take(&mut current));
                current = word.to_string();
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }

        Some(lines.iter().map(|line| shape_line(line)).collect())
    }

    /// Pick the largest font size at which `text` fits `bbox`
    ///
    /// Falls back to the minimum size, one word per overflowing line, when
    /// nothing fits.
    pub fn layout(&self, text: &str, bbox: &BoundingBox) -> TextLayout {
        let upper = self.max_font_size.min(bbox.height as f32).max(self.min_font_size);

        let mut size = upper;
        while size >= self.min_font_size {
            if let Some(lines) = self.wrap(text, size, bbox.width) {
                let line_height = self.line_height(size);
                if line_height * lines.len() as f32 <= bbox.height as f32 {
                    return TextLayout {
                        font_size: size,
                        lines,
                        line_height,
                        fits: true,
                    };
                }
            }
            size -= 1.0;
        }

        let size = self.min_font_size;
        let lines = self
            .wrap(text, size, bbox.width)
            .unwrap_or_else(|| text.split_whitespace().map(shape_line).collect());
        TextLayout {
            font_size: size,
            lines,
            line_height: self.line_height(size),
            fits: false,
        }
    }

    /// Fail when the font would draw any character of `text` as a blank box
    fn check_coverage(&self, text: &str) -> Result<(), ImagingError> {
        let mut missing: Vec<char> = shape_line(text)
            .chars()
            .filter(|c| !is_invisible(*c) && self.font.glyph_id(*c).0 == 0)
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        missing.sort_unstable();
        missing.dedup();
        Err(ImagingError::Rendering(format!(
            "font has no glyphs for {:?}",
            missing.into_iter().collect::<String>()
        )))
    }

    fn draw_placement(&self, canvas: &mut RgbaImage, placement: &TextPlacement) -> Result<(), ImagingError> {
        let bbox = placement.bbox.clamp_to(canvas.width(), canvas.height());
        if bbox.is_empty() || placement.text.trim().is_empty() {
            return Ok(());
        }
        self.check_coverage(&placement.text)?;

        let layout = self.layout(&placement.text, &bbox);
        if !layout.fits {
            tracing::debug!(
                text = %placement.text,
                width = bbox.width,
                height = bbox.height,
                "Text does not fit its box, clipping"
            );
        }

        let shade = if mean_luminance(canvas, &bbox) > 127.5 { 0u8 } else { 255u8 };
        let color = Rgba([shade, shade, shade, 255]);
        let mut layer = RgbaImage::from_pixel(bbox.width, bbox.height, Rgba([shade, shade, shade, 0]));

        let block_height = layout.line_height * layout.lines.len() as f32;
        let top = (bbox.height as f32 - block_height) / 2.0;
        for (i, line) in layout.lines.iter().enumerate() {
            let width = self.line_width(layout.font_size, line) as f32;
            let x = (bbox.width as f32 - width) / 2.0;
            let y = top + i as f32 * layout.line_height;
            draw_text_mut(
                &mut layer,
                color,
                x.round() as i32,
                y.round() as i32,
                PxScale::from(layout.font_size),
                &self.font,
                line,
            );
        }

        imageops::overlay(canvas, &layer, bbox.x as i64, bbox.y as i64);
        Ok(())
    }
}

impl TextRenderer for ArabicRenderer {
    fn render(&self, image: &DynamicImage, placements: &[TextPlacement]) -> Result<DynamicImage, ImagingError> {
        let mut canvas = image.to_rgba8();
        for placement in placements {
            self.draw_placement(&mut canvas, placement)?;
        }

        let rendered = DynamicImage::ImageRgba8(canvas);
        Ok(if image.color().has_alpha() {
            rendered
        } else {
            DynamicImage::ImageRgb8(rendered.to_rgb8())
        })
    }
}

/// Whitespace, controls and zero-width marks need no glyph
fn is_invisible(c: char) -> bool {
    c.is_whitespace() || c.is_control() || ('\u{200B}'..='\u{200F}').contains(&c)
}

/// Mean luma of the region, in `[0, 255]`
fn mean_luminance(image: &RgbaImage, bbox: &BoundingBox) -> f32 {
    let mut total = 0f64;
    for y in bbox.y..bbox.bottom() {
        for x in bbox.x..bbox.right() {
            let [r, g, b, _] = image.get_pixel(x, y).0;
            total += 0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64;
        }
    }
    (total / bbox.area().max(1) as f64) as f32
}
