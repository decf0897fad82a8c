//! Arabic shaping and visual ordering
//!
//! Fonts draw glyphs left to right in the order given, so Arabic text has to
//! be reshaped into its joined presentation forms and reordered into visual
//! order before it is rasterized.

use unicode_bidi::BidiInfo;

/// Shape one line of text and reorder it for left-to-right drawing
pub fn shape_line(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let reshaped = ar_reshaper::reshape_line(text);
    let bidi = BidiInfo::new(&reshaped, None);
    match bidi.paragraphs.first() {
        Some(paragraph) => bidi
            .reorder_line(paragraph, paragraph.range.clone())
            .into_owned(),
        None => reshaped,
    }
}
