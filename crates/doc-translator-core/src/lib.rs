//! Document Translator Core Library
//!
//! This library provides the core functionality for translating office
//! documents in place:
//! - Sentence-bounded text segmentation with an eligibility filter
//! - Translation via OpenAI-compatible APIs with caching and retries
//! - Format-preserving rewriters for DOCX and PDF
//! - Background job orchestration with a bounded worker pool

pub mod cache;
pub mod config;
pub mod document;
pub mod error;
pub mod job;
pub mod pdf;
pub mod segment;
pub mod translator;
pub mod util;

pub use cache::{CacheKey, TranslationCache};
pub use config::{
    AppConfig, DEFAULT_SOURCE_LANG, DEFAULT_TARGET_LANG, Lang, TextColor, TranslatorConfig,
};
pub use document::{DocumentFormat, DocxRewriter, PdfRewriter, RewriteControl};
pub use error::{Error, Result};
pub use job::{JobManager, JobReport, JobStatus};
pub use pdf::{BoundingBox, OverlayOptions, PdfDocument, PdfOverlay, TextBlock};
pub use segment::{Segmenter, should_translate};
pub use translator::{OpenAiTranslator, TranslationClient, Translator, create_translator};
pub use util::clear_translation_cache;

use std::sync::Arc;

/// High-level translator dispatching to the right rewriter by format.
///
/// Holds one [`TranslationClient`] per instance; create a fresh instance
/// per document so chunk progress counts stay per-document.
pub struct DocumentTranslator {
    client: TranslationClient,
    text_color: TextColor,
}

impl DocumentTranslator {
    /// Create from configuration, building the translator backend it names.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let service = create_translator(&config.translator)?;
        Self::with_service(service, config)
    }

    /// Create with a caller-provided translator backend.
    pub fn with_service(service: Arc<dyn Translator>, config: &AppConfig) -> Result<Self> {
        Ok(Self {
            client: TranslationClient::new(service, config)?,
            text_color: config.text_color,
        })
    }

    /// Create with a shared cache (for cache sharing across documents).
    pub fn from_parts(
        service: Arc<dyn Translator>,
        config: &AppConfig,
        cache: TranslationCache,
    ) -> Self {
        Self {
            client: TranslationClient::with_cache(service, config, cache),
            text_color: config.text_color,
        }
    }

    /// Translate a document, preserving its layout and non-text content.
    pub async fn translate(
        &self,
        bytes: &[u8],
        format: DocumentFormat,
        ctrl: &RewriteControl,
    ) -> Result<Vec<u8>> {
        match format {
            DocumentFormat::Docx => DocxRewriter::new(&self.client).rewrite(bytes, ctrl).await,
            DocumentFormat::Pdf => {
                let options = OverlayOptions {
                    text_color: self.text_color,
                };
                PdfRewriter::new(&self.client, options)
                    .rewrite(bytes, ctrl)
                    .await
            }
        }
    }

    pub const fn client(&self) -> &TranslationClient {
        &self.client
    }
}
