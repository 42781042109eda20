//! Translation overlays for PDF pages.
//!
//! # Coordinate System
//!
//! PDF content streams use a bottom-left origin with y growing upward;
//! mupdf extraction uses a top-left origin with y growing downward. Overlay
//! placement converts with `pdf_y = page_height - mupdf_y`.
//!
//! # Overlay Strategy
//!
//! Each block is rendered in two phases: a white rectangle covering the
//! original text, then the translated text on top, wrapped to the block's
//! width. Translations often run longer than the source, so the font size
//! steps down from the extracted estimate until the wrapped lines fit the
//! block height (or the minimum readable size is reached). Images and
//! everything else on the page are untouched; the overlay is appended as an
//! extra content stream.

use std::fmt::Write as _;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use super::page_index::PageIndex;
use super::text::BoundingBox;
use crate::config::TextColor;
use crate::error::{Error, Result};

/// Smallest font size the step-down will go to.
const MIN_FONT_SIZE: f32 = 6.0;

/// Multiplier applied per step when shrinking to fit.
const FONT_STEP: f32 = 0.85;

/// Line height as a multiple of font size.
const LINE_HEIGHT_FACTOR: f32 = 1.2;

/// Average Helvetica character width as a fraction of font size.
const CHAR_WIDTH_FACTOR: f32 = 0.5;

/// Padding around cover rectangles (in points).
const RECT_PADDING: f32 = 2.0;

/// Extra height the wrapped text may use beyond the original block before
/// the font shrinks.
const HEIGHT_SLACK: f32 = 4.0;

/// Resource name for the overlay font.
const FONT_RESOURCE: &str = "FTrans";

/// Options for overlay rendering.
#[derive(Debug, Clone, Default)]
pub struct OverlayOptions {
    pub text_color: TextColor,
}

/// One translated block to paint over its original position.
#[derive(Debug, Clone)]
pub struct TranslationOverlay {
    /// Where the original text sat, in mupdf coordinates
    pub bbox: BoundingBox,
    /// Kept for logging
    pub original: String,
    pub translated: String,
    /// Starting size; may be stepped down to fit
    pub font_size: f32,
}

/// Wrapped lines and geometry for one overlay, in PDF coordinates.
struct RenderBlock {
    rect_x: f32,
    rect_y: f32,
    rect_width: f32,
    rect_height: f32,
    text_x: f32,
    text_start_y: f32,
    font_size: f32,
    line_height: f32,
    lines: Vec<String>,
}

impl RenderBlock {
    fn from_overlay(overlay: &TranslationOverlay, page_height: f32, page_width: f32) -> Self {
        let x = overlay.bbox.x0;
        let top_y = page_height - overlay.bbox.y0;
        let block_width = overlay.bbox.width().max(50.0);
        let block_height = overlay.bbox.height();

        let (font_size, lines) = fit_text(
            &overlay.translated,
            overlay.font_size,
            block_width,
            block_height,
        );

        let line_height = font_size * LINE_HEIGHT_FACTOR;
        #[allow(clippy::cast_precision_loss)]
        let text_height = lines.len() as f32 * line_height;

        // The rectangle covers the original block, grown if the wrapped text
        // still overruns at the minimum size
        let rect_height = block_height.max(text_height) + 2.0 * RECT_PADDING;
        let rect_x = (x - RECT_PADDING).max(0.0);
        let rect_y = top_y - rect_height + RECT_PADDING;
        let rect_width = (block_width + 2.0 * RECT_PADDING).min(page_width - rect_x);

        Self {
            rect_x,
            rect_y,
            rect_width,
            rect_height,
            text_x: x,
            text_start_y: top_y - font_size,
            font_size,
            line_height,
            lines,
        }
    }
}

/// Wrap `text` to the block width, shrinking the font from `start_size`
/// until the lines fit the block height or the size floor is reached.
fn fit_text(
    text: &str,
    start_size: f32,
    block_width: f32,
    block_height: f32,
) -> (f32, Vec<String>) {
    let mut size = start_size.clamp(MIN_FONT_SIZE, 36.0);

    loop {
        let char_width = size * CHAR_WIDTH_FACTOR;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let max_chars = (block_width / char_width).floor().max(4.0) as usize;
        let lines = word_wrap(text, max_chars);

        #[allow(clippy::cast_precision_loss)]
        let text_height = lines.len() as f32 * size * LINE_HEIGHT_FACTOR;

        if text_height <= block_height + HEIGHT_SLACK || size <= MIN_FONT_SIZE {
            return (size, lines);
        }
        size = (size * FONT_STEP).max(MIN_FONT_SIZE);
    }
}

/// Applies translation overlays to pages of an open lopdf document.
#[derive(Debug, Clone, Default)]
pub struct PdfOverlay {
    pub options: OverlayOptions,
}

impl PdfOverlay {
    pub const fn new(options: OverlayOptions) -> Self {
        Self { options }
    }

    /// Paint overlays onto one page of `doc` (zero-based page number).
    ///
    /// The document is modified in place; callers save once after all pages
    /// are done.
    pub fn apply_to_page(
        &self,
        doc: &mut Document,
        page_num: usize,
        overlays: &[TranslationOverlay],
    ) -> Result<()> {
        if overlays.is_empty() {
            return Ok(());
        }

        let pages = doc.get_pages();
        let page_index = PageIndex::try_from_page_num(page_num, pages.len())?;
        let page_id = *pages
            .get(&page_index.as_lopdf_page_number())
            .ok_or(Error::PdfInvalidPage {
                page: page_num,
                total: pages.len(),
            })?;

        let page_obj = doc
            .get_object(page_id)
            .map_err(|e| Error::Lopdf(format!("failed to get page object: {e}")))?;
        let media_box = get_media_box(doc, page_obj)?;

        ensure_overlay_font(doc, page_id)?;

        let content = self.build_content(overlays, &media_box);
        append_content_to_page(doc, page_id, &content)
    }

    fn build_content(&self, overlays: &[TranslationOverlay], media_box: &[f32; 4]) -> String {
        let page_width = media_box[2] - media_box[0];
        let page_height = media_box[3] - media_box[1];

        let blocks: Vec<RenderBlock> = overlays
            .iter()
            .map(|o| RenderBlock::from_overlay(o, page_height, page_width))
            .collect();

        let mut content = String::new();
        content.push_str("q\n");

        // Phase 1: cover all original text
        content.push_str("1 1 1 rg\n");
        for block in &blocks {
            let _ = writeln!(
                content,
                "{} {} {} {} re f",
                block.rect_x, block.rect_y, block.rect_width, block.rect_height
            );
        }

        // Phase 2: translated text on top
        let color = &self.options.text_color;
        let _ = writeln!(content, "{} {} {} rg", color.r, color.g, color.b);
        // Some scanned PDFs leave the text render mode on invisible (3)
        content.push_str("0 Tr\n");

        for block in &blocks {
            for (i, line) in block.lines.iter().enumerate() {
                #[allow(clippy::cast_precision_loss)]
                let y = block.text_start_y - (i as f32 * block.line_height);

                content.push_str("BT\n");
                let _ = writeln!(content, "/{FONT_RESOURCE} {} Tf", block.font_size);
                let _ = writeln!(content, "{} {y} Td", block.text_x);
                let _ = writeln!(content, "({}) Tj", escape_pdf_text(line));
                content.push_str("ET\n");
            }
        }

        content.push_str("Q\n");
        content
    }
}

/// Escape text for a PDF literal string with WinAnsi encoding. Characters
/// outside Latin-1 are replaced since the base-14 font cannot render them.
fn escape_pdf_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_ascii_graphic() || c == ' ' => out.push(c),
            c => {
                let code = c as u32;
                if (0xA0..0x100).contains(&code) {
                    let _ = write!(out, "\\{code:03o}");
                } else {
                    out.push('?');
                }
            }
        }
    }
    out
}

/// Register the overlay font (Helvetica, WinAnsi) in the page's resources.
fn ensure_overlay_font(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let font_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
    ]));

    let page = doc
        .get_object(page_id)
        .map_err(|e| Error::Lopdf(format!("failed to get page: {e}")))?;
    let resources = if let Object::Dictionary(dict) = page {
        dict.get(b"Resources").ok().cloned()
    } else {
        return Err(Error::Lopdf("page object is not a dictionary".to_string()));
    };

    match resources {
        // Shared resources object; mutate it where it lives
        Some(Object::Reference(res_id)) => {
            let res = doc
                .get_object_mut(res_id)
                .map_err(|e| Error::Lopdf(format!("failed to get resources: {e}")))?;
            if let Object::Dictionary(dict) = res {
                insert_font(dict, font_id);
            }
        }
        Some(Object::Dictionary(mut dict)) => {
            insert_font(&mut dict, font_id);
            set_page_resources(doc, page_id, dict)?;
        }
        _ => {
            let mut dict = Dictionary::new();
            insert_font(&mut dict, font_id);
            set_page_resources(doc, page_id, dict)?;
        }
    }

    Ok(())
}

fn insert_font(resources: &mut Dictionary, font_id: ObjectId) {
    if let Ok(Object::Dictionary(fonts)) = resources.get_mut(b"Font") {
        fonts.set(FONT_RESOURCE, Object::Reference(font_id));
    } else {
        let fonts = Dictionary::from_iter([(FONT_RESOURCE, Object::Reference(font_id))]);
        resources.set("Font", Object::Dictionary(fonts));
    }
}

fn set_page_resources(doc: &mut Document, page_id: ObjectId, resources: Dictionary) -> Result<()> {
    let page = doc
        .get_object_mut(page_id)
        .map_err(|e| Error::Lopdf(format!("failed to get page: {e}")))?;
    if let Object::Dictionary(dict) = page {
        dict.set("Resources", Object::Dictionary(resources));
    }
    Ok(())
}

fn append_content_to_page(doc: &mut Document, page_id: ObjectId, content: &str) -> Result<()> {
    let stream = Stream::new(Dictionary::new(), content.as_bytes().to_vec());
    let content_id = doc.add_object(Object::Stream(stream));

    let page = doc
        .get_object_mut(page_id)
        .map_err(|e| Error::Lopdf(format!("failed to get page: {e}")))?;

    if let Object::Dictionary(dict) = page {
        match dict.get(b"Contents").ok().cloned() {
            Some(Object::Reference(existing_id)) => {
                dict.set(
                    "Contents",
                    Object::Array(vec![
                        Object::Reference(existing_id),
                        Object::Reference(content_id),
                    ]),
                );
            }
            Some(Object::Array(mut arr)) => {
                arr.push(Object::Reference(content_id));
                dict.set("Contents", Object::Array(arr));
            }
            _ => {
                dict.set("Contents", Object::Reference(content_id));
            }
        }
    }

    Ok(())
}

/// Media box from the page, walking up to the parent when inherited.
fn get_media_box(doc: &Document, page_obj: &Object) -> Result<[f32; 4]> {
    if let Object::Dictionary(dict) = page_obj {
        if let Ok(Object::Array(arr)) = dict.get(b"MediaBox")
            && arr.len() == 4
        {
            let values: Vec<f32> = arr
                .iter()
                .filter_map(|o| match o {
                    #[allow(clippy::cast_precision_loss)]
                    Object::Integer(i) => Some(*i as f32),
                    Object::Real(r) => Some(*r),
                    _ => None,
                })
                .collect();

            if values.len() == 4 {
                return Ok([values[0], values[1], values[2], values[3]]);
            }
        }

        if let Ok(Object::Reference(parent_id)) = dict.get(b"Parent")
            && let Ok(parent) = doc.get_object(*parent_id)
        {
            return get_media_box(doc, parent);
        }
    }

    // US Letter fallback
    Ok([0.0, 0.0, 612.0, 792.0])
}

/// Word wrap text to fit within `max_chars` per line.
fn word_wrap(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current = word.to_string();
        } else if current.len() + 1 + word.len() <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(current);
            current = word.to_string();
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_word_wrap_basic() {
        let lines = word_wrap("Hello world this is a test", 10);
        assert_eq!(lines, vec!["Hello", "world this", "is a test"]);
    }

    #[test]
    fn test_word_wrap_empty() {
        assert_eq!(word_wrap("", 10), vec![String::new()]);
    }

    #[test]
    fn test_word_wrap_long_word_gets_own_line() {
        let lines = word_wrap("a extraordinarily long", 10);
        assert_eq!(lines, vec!["a", "extraordinarily", "long"]);
    }

    #[test]
    fn test_escape_parentheses_and_backslash() {
        assert_eq!(escape_pdf_text(r"f(x) = a\b"), r"f\(x\) = a\\b");
    }

    #[test]
    fn test_escape_latin1_as_octal() {
        assert_eq!(escape_pdf_text("café"), "caf\\351");
    }

    #[test]
    fn test_escape_replaces_unmappable() {
        assert_eq!(escape_pdf_text("日本"), "??");
    }

    #[test]
    fn test_fit_text_keeps_size_when_it_fits() {
        let (size, lines) = fit_text("Short", 12.0, 200.0, 14.0);
        assert_eq!(lines.len(), 1);
        assert!((size - 12.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_fit_text_steps_down_for_long_text() {
        let text = "A sentence that keeps going and going well past the block. ".repeat(8);
        let (size, lines) = fit_text(&text, 12.0, 100.0, 12.0);
        assert!(size < 12.0);
        assert!(size >= MIN_FONT_SIZE);
        assert!(lines.len() > 1);
    }

    #[test]
    fn test_fit_text_never_below_floor() {
        let text = "word ".repeat(500);
        let (size, _) = fit_text(&text, 12.0, 50.0, 10.0);
        assert!((size - MIN_FONT_SIZE).abs() < f32::EPSILON);
    }
}
