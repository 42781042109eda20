use crate::config::Lang;

/// Cache key for translated chunks.
///
/// Keys are opaque MD5 hashes of all relevant inputs, ensuring:
/// - Same chunk text + backend + language pair = same key
/// - Any change to inputs produces a different key
/// - Keys are fixed-length (32 hex chars) for consistent storage
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    hash: String,
}

impl CacheKey {
    /// Key for one chunk of text under a fixed translator and language pair.
    pub fn from_chunk(
        chunk_text: &str,
        translator: &str,
        source_lang: &Lang,
        target_lang: &Lang,
    ) -> Self {
        // Null-byte separators prevent collisions between inputs like
        // ("a", "bc") and ("ab", "c").
        let combined = format!(
            "{}\0{}\0{}\0{}",
            chunk_text,
            translator.to_lowercase(),
            source_lang.as_str(),
            target_lang.as_str(),
        );

        Self {
            hash: format!("{:x}", md5::compute(combined.as_bytes())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(text: &str, translator: &str, src: &str, tgt: &str) -> CacheKey {
        CacheKey::from_chunk(text, translator, &Lang::new(src), &Lang::new(tgt))
    }

    #[test]
    fn test_cache_key_is_fixed_length_hash() {
        let k = key("Hello world", "openai", "auto", "es");
        assert_eq!(k.to_string().len(), 32);
        assert!(k.to_string().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_cache_key_same_inputs_same_key() {
        assert_eq!(key("Hello", "openai", "auto", "es"), key("Hello", "openai", "auto", "es"));
    }

    #[test]
    fn test_cache_key_differs_by_text() {
        assert_ne!(key("Hello", "openai", "auto", "es"), key("World", "openai", "auto", "es"));
    }

    #[test]
    fn test_cache_key_differs_by_translator() {
        assert_ne!(key("Hello", "openai", "auto", "es"), key("Hello", "mock", "auto", "es"));
    }

    #[test]
    fn test_cache_key_differs_by_language_pair() {
        assert_ne!(key("Hello", "openai", "auto", "es"), key("Hello", "openai", "auto", "fr"));
        assert_ne!(key("Hello", "openai", "en", "es"), key("Hello", "openai", "auto", "es"));
    }

    #[test]
    fn test_cache_key_case_insensitive_translator() {
        assert_eq!(key("Hello", "OpenAI", "auto", "es"), key("Hello", "openai", "auto", "es"));
    }
}
