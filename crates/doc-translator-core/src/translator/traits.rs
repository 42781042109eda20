use async_trait::async_trait;

use crate::config::Lang;
use crate::error::Result;

/// Information about a translator backend
#[derive(Debug, Clone)]
pub struct TranslatorInfo {
    /// Human-readable name
    pub name: &'static str,
    /// Whether this translator requires an API key
    pub requires_api_key: bool,
    /// Whether this translator supports auto-detection of source language
    pub supports_auto_detect: bool,
}

/// Typed boundary to the external machine-translation service.
///
/// One call is one attempt: retries, backoff, and caching live in
/// [`crate::TranslationClient`], which wraps this trait. A success with empty
/// text is still a success here; the client treats it as a failed attempt.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Get information about this translator
    fn info(&self) -> TranslatorInfo;

    /// Get the translator name (convenience method)
    fn name(&self) -> &'static str {
        self.info().name
    }

    /// Translate text from source language to target language
    async fn translate(&self, text: &str, source: &Lang, target: &Lang) -> Result<String>;

    /// Drop and rebuild any underlying connection or session.
    ///
    /// Called by the client between failed attempts to recover from stale
    /// sessions. The default is a no-op for stateless backends.
    fn reset_session(&self) {}

    /// Check if the translator is available (e.g., API key configured)
    fn is_available(&self) -> bool {
        true
    }
}
