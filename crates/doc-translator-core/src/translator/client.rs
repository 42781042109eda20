//! Caching, retrying translation client.
//!
//! Wraps a [`Translator`] backend with everything the pipeline needs to
//! survive a slow, rate-limited, occasionally-unavailable service: a
//! per-instance cache, an exponential-backoff retry loop, and graceful
//! degradation. `translate_chunk` never fails — when every attempt is
//! exhausted the original text is returned and the failure is logged, so a
//! bad chunk costs one untranslated passage, not the whole document.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, warn};

use super::retry::RetryPolicy;
use super::traits::Translator;
use crate::cache::{CacheKey, TranslationCache};
use crate::config::{AppConfig, Lang};
use crate::error::Result;
use crate::segment::{Segmenter, should_translate};

/// Translation client bound to a fixed language pair.
///
/// Constructed fresh per job; the cache and segment counter are instance
/// state, safe for concurrent use should chunk translation ever be
/// parallelized.
pub struct TranslationClient {
    service: Arc<dyn Translator>,
    retry: RetryPolicy,
    cache: TranslationCache,
    segmenter: Segmenter,
    source: Lang,
    target: Lang,
    /// Chunks processed so far, used for progress reporting
    translated_segments: AtomicUsize,
}

impl TranslationClient {
    pub fn new(service: Arc<dyn Translator>, config: &AppConfig) -> Result<Self> {
        let cache = TranslationCache::new(&config.cache)?;
        Ok(Self::with_cache(service, config, cache))
    }

    pub fn with_cache(
        service: Arc<dyn Translator>,
        config: &AppConfig,
        cache: TranslationCache,
    ) -> Self {
        Self {
            service,
            retry: RetryPolicy::from_config(&config.translator),
            cache,
            segmenter: Segmenter::new(config.segmenter.max_chunk_size),
            source: config.source_lang.clone(),
            target: config.target_lang.clone(),
            translated_segments: AtomicUsize::new(0),
        }
    }

    pub const fn segmenter(&self) -> &Segmenter {
        &self.segmenter
    }

    /// Chunks processed so far (cache hits and fallbacks included).
    pub fn translated_segments(&self) -> usize {
        self.translated_segments.load(Ordering::SeqCst)
    }

    /// Translate one chunk. Never fails: exhausted retries fall back to the
    /// original text.
    pub async fn translate_chunk(&self, chunk: &str) -> String {
        if chunk.trim().is_empty() {
            return chunk.to_string();
        }

        let key = CacheKey::from_chunk(chunk, self.service.name(), &self.source, &self.target);

        if let Some(cached) = self.cache.get(&key).await {
            debug!("Cache hit for chunk ({} chars)", chunk.len());
            self.bump_segment_count();
            return cached;
        }

        let mut last_error = None;

        for attempt in 1..=self.retry.max_attempts {
            match self.service.translate(chunk, &self.source, &self.target).await {
                Ok(translated) if !translated.trim().is_empty() => {
                    self.cache.insert(&key, &translated).await;
                    self.bump_segment_count();
                    return translated;
                }
                Ok(_) => {
                    warn!(
                        "Attempt {}/{}: translation returned empty result",
                        attempt, self.retry.max_attempts
                    );
                    last_error = Some(crate::error::Error::TranslationInvalidResponse(
                        "empty result".to_string(),
                    ));
                }
                Err(e) => {
                    warn!("Attempt {}/{} failed: {}", attempt, self.retry.max_attempts, e);
                    last_error = Some(e);
                }
            }

            if attempt < self.retry.max_attempts {
                if let Some(ref err) = last_error {
                    let delay = self.retry.delay_after(attempt, err);
                    if RetryPolicy::is_rate_limited(err) {
                        warn!("Rate limit detected, waiting {:.1}s", delay.as_secs_f64());
                    }
                    tokio::time::sleep(delay).await;
                }
                // Stale sessions are a known failure mode; start the next
                // attempt from a fresh connection.
                self.service.reset_session();
            }
        }

        warn!(
            "All {} attempts exhausted, keeping original text ({} chars)",
            self.retry.max_attempts,
            chunk.len()
        );
        self.bump_segment_count();
        chunk.to_string()
    }

    /// Translate a whole text unit: eligibility filter, segmentation,
    /// ordered chunk translation, and a whole-unit cache around it all.
    pub async fn translate_text(&self, text: &str) -> String {
        if !should_translate(text) {
            return text.to_string();
        }

        let trimmed = text.trim();
        // The trimmed core goes through segmentation and caching; the
        // surrounding whitespace is restored on the way out
        let prefix = &text[..text.len() - text.trim_start().len()];
        let suffix = &text[text.trim_end().len()..];

        let unit_key =
            CacheKey::from_chunk(trimmed, self.service.name(), &self.source, &self.target);
        if let Some(cached) = self.cache.get(&unit_key).await {
            self.translated_segments
                .fetch_add(self.segmenter.chunk_count(trimmed), Ordering::SeqCst);
            return format!("{prefix}{cached}{suffix}");
        }

        let chunks = self.segmenter.segment(trimmed);

        let result = match chunks.len() {
            0 => return text.to_string(),
            1 => self.translate_chunk(&chunks[0]).await,
            _ => {
                debug!("Translating large unit as {} chunks", chunks.len());
                let mut translated = Vec::with_capacity(chunks.len());
                for chunk in &chunks {
                    translated.push(self.translate_chunk(chunk).await);
                }
                translated.join(" ")
            }
        };

        if chunks.len() > 1 {
            self.cache.insert(&unit_key, &result).await;
        }

        format!("{prefix}{result}{suffix}")
    }

    /// Chunks `translate_text` would process for this unit; zero when the
    /// eligibility filter passes it through.
    pub fn segment_count(&self, text: &str) -> usize {
        if should_translate(text) {
            self.segmenter.chunk_count(text.trim())
        } else {
            0
        }
    }

    fn bump_segment_count(&self) {
        self.translated_segments.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::TranslatorConfig;
    use crate::error::Error;
    use crate::translator::TranslatorInfo;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU32;

    /// Mock service counting calls; fails the first `fail_first` attempts.
    struct CountingService {
        calls: AtomicU32,
        resets: AtomicU32,
        fail_first: u32,
    }

    impl CountingService {
        fn new(fail_first: u32) -> Self {
            Self {
                calls: AtomicU32::new(0),
                resets: AtomicU32::new(0),
                fail_first,
            }
        }
    }

    #[async_trait]
    impl Translator for CountingService {
        fn info(&self) -> TranslatorInfo {
            TranslatorInfo {
                name: "mock",
                requires_api_key: false,
                supports_auto_detect: true,
            }
        }

        async fn translate(&self, text: &str, _source: &Lang, _target: &Lang) -> Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.fail_first {
                return Err(Error::TranslationRequest("mock failure".to_string()));
            }
            Ok(format!("[T] {text}"))
        }

        fn reset_session(&self) {
            self.resets.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn fast_config() -> AppConfig {
        AppConfig {
            translator: TranslatorConfig {
                max_attempts: 5,
                base_delay_ms: 1,
                rate_limit_cap_ms: 5,
                ..TranslatorConfig::default()
            },
            ..AppConfig::default()
        }
    }

    fn client_with(service: Arc<CountingService>) -> TranslationClient {
        TranslationClient::new(service, &fast_config()).unwrap()
    }

    #[tokio::test]
    async fn test_cache_idempotence_single_external_call() {
        let service = Arc::new(CountingService::new(0));
        let client = client_with(Arc::clone(&service));

        let first = client.translate_chunk("Hello world").await;
        let second = client.translate_chunk("Hello world").await;

        assert_eq!(first, "[T] Hello world");
        assert_eq!(first, second);
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
        assert_eq!(client.translated_segments(), 2);
    }

    #[tokio::test]
    async fn test_retry_exhaustion_falls_back_to_original() {
        let service = Arc::new(CountingService::new(u32::MAX));
        let client = client_with(Arc::clone(&service));

        let result = client.translate_chunk("Hello world").await;

        assert_eq!(result, "Hello world");
        assert_eq!(service.calls.load(Ordering::SeqCst), 5);
        // Session reset after every failed attempt except the last
        assert_eq!(service.resets.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_retry_recovers_after_transient_failures() {
        let service = Arc::new(CountingService::new(2));
        let client = client_with(Arc::clone(&service));

        let result = client.translate_chunk("Hello world").await;

        assert_eq!(result, "[T] Hello world");
        assert_eq!(service.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_translate_text_passes_through_ineligible() {
        let service = Arc::new(CountingService::new(0));
        let client = client_with(Arc::clone(&service));

        assert_eq!(client.translate_text("support@example.com").await, "support@example.com");
        assert_eq!(client.translate_text("123-456").await, "123-456");
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_translate_text_mixed_content_translated_whole() {
        let service = Arc::new(CountingService::new(0));
        let client = client_with(Arc::clone(&service));

        let result = client
            .translate_text("Contact us at support@example.com for help.")
            .await;
        assert_eq!(result, "[T] Contact us at support@example.com for help.");
    }

    #[tokio::test]
    async fn test_translate_text_preserves_surrounding_whitespace() {
        let service = Arc::new(CountingService::new(0));
        let client = client_with(Arc::clone(&service));

        assert_eq!(
            client.translate_text("  Hello world.\n").await,
            "  [T] Hello world.\n"
        );
        // The cached path restores it too
        assert_eq!(
            client.translate_text("\tHello world.").await,
            "\t[T] Hello world."
        );
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_translate_text_rejoins_chunks_in_order() {
        let service = Arc::new(CountingService::new(0));
        let mut config = fast_config();
        config.segmenter.max_chunk_size = 25;
        let client = TranslationClient::new(Arc::clone(&service) as Arc<dyn Translator>, &config).unwrap();

        let result = client
            .translate_text("First sentence here. Second sentence there.")
            .await;
        assert_eq!(result, "[T] First sentence here. [T] Second sentence there.");
    }

    #[tokio::test]
    async fn test_segment_count_matches_translation_progress() {
        let service = Arc::new(CountingService::new(0));
        let mut config = fast_config();
        config.segmenter.max_chunk_size = 20;
        let client = TranslationClient::new(Arc::clone(&service) as Arc<dyn Translator>, &config).unwrap();

        let text = "First sentence here. Second sentence there.";
        let expected = client.segment_count(text);
        let _ = client.translate_text(text).await;

        assert_eq!(client.translated_segments(), expected);
    }
}
