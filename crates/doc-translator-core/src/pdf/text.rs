//! Text block extraction from PDF pages.
//!
//! mupdf groups text into blocks that roughly correspond to paragraphs; we
//! flatten each block's lines into one string, joining hyphenated line
//! breaks, and keep the block's bounding box so the overlay can place the
//! translation where the original text sat.

use mupdf::TextPageOptions;

use super::document::PdfDocument;
use super::page_index::PageIndex;
use crate::error::{Error, Result};

/// Font size estimate scale: mupdf line boxes run slightly shorter than the
/// visual glyph size.
const FONT_SIZE_SCALE: f32 = 1.18;

/// A paragraph-level text block with its position on the page.
#[derive(Debug, Clone)]
pub struct TextBlock {
    pub text: String,
    /// Position in mupdf coordinates (top-left origin, y grows downward)
    pub bbox: BoundingBox,
    /// Estimated from average line height
    pub font_size: f32,
    pub line_count: usize,
}

/// Axis-aligned box in mupdf page coordinates.
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BoundingBox {
    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Smallest box containing both.
    pub fn union(self, other: Self) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    pub const fn from_quad(quad: &mupdf::Quad) -> Self {
        let x0 = quad.ul.x.min(quad.ur.x).min(quad.ll.x).min(quad.lr.x);
        let y0 = quad.ul.y.min(quad.ur.y).min(quad.ll.y).min(quad.lr.y);
        let x1 = quad.ul.x.max(quad.ur.x).max(quad.ll.x).max(quad.lr.x);
        let y1 = quad.ul.y.max(quad.ur.y).max(quad.ll.y).max(quad.lr.y);
        Self { x0, y0, x1, y1 }
    }
}

/// Extracts paragraph blocks from pages of a [`PdfDocument`].
pub struct TextExtractor<'a> {
    doc: &'a PdfDocument,
    /// Blocks shorter than this are dropped as artifacts (page numbers,
    /// stray marks)
    min_length: usize,
}

impl<'a> TextExtractor<'a> {
    pub const fn new(doc: &'a PdfDocument) -> Self {
        Self { doc, min_length: 3 }
    }

    /// Extract paragraph blocks from one page (zero-based).
    pub fn extract_page_blocks(&self, page_num: usize) -> Result<Vec<TextBlock>> {
        let page_index = PageIndex::try_from_page_num(page_num, self.doc.page_count())?;

        let doc = self.doc.open_document()?;
        let page = doc
            .load_page(page_index.into())
            .map_err(|e| Error::PdfTextExtraction {
                page: page_num,
                reason: format!("failed to load page: {e}"),
            })?;

        let text_page = page
            .to_text_page(TextPageOptions::empty())
            .map_err(|e| Error::PdfTextExtraction {
                page: page_num,
                reason: format!("failed to build text page: {e}"),
            })?;

        let mut blocks = Vec::new();

        for block in text_page.blocks() {
            let mut text = String::new();
            let mut bbox: Option<BoundingBox> = None;
            let mut line_count = 0;
            let mut line_heights = Vec::new();

            for line in block.lines() {
                let mut line_text = String::new();
                let mut line_bbox: Option<BoundingBox> = None;

                for text_char in line.chars() {
                    if let Some(c) = text_char.char() {
                        line_text.push(c);
                    }
                    let char_bbox = BoundingBox::from_quad(&text_char.quad());
                    line_bbox = Some(line_bbox.map_or(char_bbox, |b| b.union(char_bbox)));
                }

                let trimmed = line_text.trim();
                if trimmed.is_empty() {
                    continue;
                }

                if let Some(lb) = line_bbox {
                    line_heights.push(lb.height());
                    bbox = Some(bbox.map_or(lb, |b| b.union(lb)));
                }
                line_count += 1;

                // Join lines into one paragraph, undoing end-of-line
                // hyphenation
                if text.ends_with('-') {
                    text.pop();
                } else if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(trimmed);
            }

            let text = text.trim().to_string();
            if text.len() < self.min_length {
                continue;
            }

            if let Some(bbox) = bbox {
                blocks.push(TextBlock {
                    text,
                    bbox,
                    font_size: estimate_font_size(&line_heights, bbox, line_count),
                    line_count,
                });
            }
        }

        Ok(blocks)
    }
}

#[allow(clippy::cast_precision_loss)] // Line counts stay tiny
fn estimate_font_size(line_heights: &[f32], bbox: BoundingBox, line_count: usize) -> f32 {
    let avg_line_height = if line_heights.is_empty() {
        bbox.height() / line_count.max(1) as f32
    } else {
        line_heights.iter().sum::<f32>() / line_heights.len() as f32
    };
    (avg_line_height * FONT_SIZE_SCALE).clamp(6.0, 36.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_dimensions() {
        let bbox = BoundingBox::new(10.0, 20.0, 110.0, 45.0);
        assert!((bbox.width() - 100.0).abs() < f32::EPSILON);
        assert!((bbox.height() - 25.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_bbox_union() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 5.0, 20.0, 8.0);
        let u = a.union(b);
        assert!((u.x0 - 0.0).abs() < f32::EPSILON);
        assert!((u.y0 - 0.0).abs() < f32::EPSILON);
        assert!((u.x1 - 20.0).abs() < f32::EPSILON);
        assert!((u.y1 - 10.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_font_size_from_line_heights() {
        let bbox = BoundingBox::new(0.0, 0.0, 100.0, 40.0);
        let size = estimate_font_size(&[10.0, 10.0], bbox, 2);
        assert!((size - 11.8).abs() < 0.01);
    }

    #[test]
    fn test_font_size_clamped() {
        let bbox = BoundingBox::new(0.0, 0.0, 100.0, 400.0);
        assert!((estimate_font_size(&[100.0], bbox, 1) - 36.0).abs() < f32::EPSILON);
        assert!((estimate_font_size(&[1.0], bbox, 1) - 6.0).abs() < f32::EPSILON);
    }
}
