//! PDF rewriting.
//!
//! PDF text cannot be edited in place the way DOCX XML can, so translation
//! is rendered as an overlay: each extracted text block is covered with a
//! white rectangle and the translated text is drawn over it. Page overlays
//! are applied into one shared lopdf document which is saved once at the
//! end, keeping untouched objects (images, vector graphics, other pages)
//! exactly as they were.

use tracing::{debug, info};

use super::RewriteControl;
use crate::error::{Error, Result};
use crate::pdf::{OverlayOptions, PdfDocument, PdfOverlay, TextBlock, TextExtractor, TranslationOverlay};
use crate::segment::should_translate;
use crate::translator::TranslationClient;

pub struct PdfRewriter<'a> {
    client: &'a TranslationClient,
    overlay: PdfOverlay,
}

impl<'a> PdfRewriter<'a> {
    pub const fn new(client: &'a TranslationClient, options: OverlayOptions) -> Self {
        Self {
            client,
            overlay: PdfOverlay::new(options),
        }
    }

    /// Translate all text blocks in a PDF, returning the overlaid document.
    pub async fn rewrite(&self, bytes: &[u8], ctrl: &RewriteControl) -> Result<Vec<u8>> {
        let doc = PdfDocument::from_bytes(bytes)?;
        let extractor = TextExtractor::new(&doc);

        // Extract everything up front so the progress total is known
        let mut pages: Vec<Vec<TextBlock>> = Vec::with_capacity(doc.page_count());
        for page_num in 0..doc.page_count() {
            pages.push(extractor.extract_page_blocks(page_num)?);
        }

        let total: usize = pages
            .iter()
            .flat_map(|blocks| blocks.iter())
            .map(|b| self.client.segment_count(&b.text))
            .sum();
        let baseline = self.client.translated_segments();
        ctrl.report(0, total);

        let mut out_doc = lopdf::Document::load_mem(bytes)
            .map_err(|e| Error::Lopdf(format!("failed to load PDF: {e}")))?;

        for (page_num, blocks) in pages.iter().enumerate() {
            let mut overlays = Vec::new();

            for block in blocks {
                ctrl.check_cancelled()?;
                if !should_translate(&block.text) {
                    continue;
                }

                let translated = self.client.translate_text(&block.text).await;
                // A block the service could not translate stays readable as
                // the original; only actual changes get painted over
                if translated != block.text {
                    overlays.push(TranslationOverlay {
                        bbox: block.bbox,
                        original: block.text.clone(),
                        translated,
                        font_size: block.font_size,
                    });
                }
                ctrl.report(
                    self.client.translated_segments().saturating_sub(baseline),
                    total,
                );
            }

            debug!(
                "Page {}: {} blocks, {} overlaid",
                page_num + 1,
                blocks.len(),
                overlays.len()
            );
            self.overlay.apply_to_page(&mut out_doc, page_num, &overlays)?;
        }

        let mut output = Vec::new();
        out_doc
            .save_to(&mut output)
            .map_err(|e| Error::PdfSave(e.to_string()))?;

        info!(
            "Rewrote {} page PDF ({} -> {} bytes)",
            doc.page_count(),
            bytes.len(),
            output.len()
        );
        Ok(output)
    }
}
