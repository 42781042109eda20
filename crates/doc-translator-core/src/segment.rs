//! Sentence-bounded text segmentation.
//!
//! External translation calls carry a size limit, but translation quality
//! depends on sentence-level context. The segmenter reconciles the two by
//! splitting text on sentence boundaries and greedily packing consecutive
//! sentences into chunks that never exceed the configured limit. A single
//! sentence longer than the limit is split on word boundaries, never inside
//! a word.

use std::sync::LazyLock;

use regex::Regex;

/// Sentence boundary: one or more terminators, optional closing quote or
/// bracket, then whitespace. The boundary whitespace is consumed so chunks
/// rejoin with single spaces.
static SENTENCE_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)] // pattern is a compile-time constant
    Regex::new(r#"[.!?]+["')\]]*\s+"#).expect("sentence boundary regex is valid")
});

/// Purely numeric/punctuation text (dates, page numbers, phone-ish strings).
static NUMERIC_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)] // pattern is a compile-time constant
    Regex::new(r"^[\d\s\-/.,]+$").expect("numeric pattern regex is valid")
});

/// Splits text into translation chunks bounded by `max_chunk_size` characters.
///
/// Segmentation is deterministic: the same input and limit always yield the
/// same chunk boundaries.
#[derive(Debug, Clone)]
pub struct Segmenter {
    max_chunk_size: usize,
}

impl Segmenter {
    pub const fn new(max_chunk_size: usize) -> Self {
        Self { max_chunk_size }
    }

    pub const fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    /// Split `text` into ordered chunks, each at most `max_chunk_size` chars
    /// except when a single word alone exceeds the limit.
    pub fn segment(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        if text.chars().count() <= self.max_chunk_size {
            return vec![text.to_string()];
        }

        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_size = 0usize;

        for sentence in split_sentences(text) {
            let sentence_size = sentence.chars().count();

            // Oversized sentences bypass packing and get word-split directly
            if sentence_size > self.max_chunk_size {
                if !current.is_empty() {
                    chunks.push(current.join(" "));
                    current.clear();
                    current_size = 0;
                }
                chunks.extend(self.split_on_words(sentence));
                continue;
            }

            if current_size + sentence_size > self.max_chunk_size && !current.is_empty() {
                chunks.push(current.join(" "));
                current = vec![sentence];
                current_size = sentence_size + 1; // joining space
            } else {
                current.push(sentence);
                current_size += sentence_size + 1; // joining space
            }
        }

        if !current.is_empty() {
            chunks.push(current.join(" "));
        }

        chunks
    }

    /// How many chunks `segment` would produce, for progress denominators.
    pub fn chunk_count(&self, text: &str) -> usize {
        self.segment(text).len()
    }

    /// Split a single oversized sentence on word boundaries.
    fn split_on_words(&self, sentence: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_size = 0usize;

        for word in sentence.split_whitespace() {
            let word_size = word.chars().count() + 1; // joining space
            if current_size + word_size > self.max_chunk_size && !current.is_empty() {
                chunks.push(current.join(" "));
                current = vec![word];
                current_size = word_size;
            } else {
                current.push(word);
                current_size += word_size;
            }
        }

        if !current.is_empty() {
            chunks.push(current.join(" "));
        }

        chunks
    }
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(crate::config::SegmenterConfig::default().max_chunk_size)
    }
}

/// Split text into sentences on terminator-plus-whitespace boundaries.
///
/// Each returned slice keeps its terminating punctuation; the boundary
/// whitespace between sentences is dropped.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for boundary in SENTENCE_BOUNDARY.find_iter(text) {
        let sentence = text[start..boundary.end()].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        start = boundary.end();
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }

    sentences
}

/// Eligibility pre-filter: decide whether a text unit should be sent for
/// translation or passed through verbatim.
///
/// Excluded: empty or sub-2-char text, single-token email addresses, URLs,
/// purely numeric/punctuation strings, and text with no letters at all.
pub fn should_translate(text: &str) -> bool {
    let text = text.trim();

    if text.chars().count() < 2 {
        return false;
    }

    // Email addresses: single token containing both '@' and '.'
    if text.contains('@') && text.contains('.') && text.split_whitespace().count() == 1 {
        return false;
    }

    // URLs
    if text.starts_with("http://") || text.starts_with("https://") || text.starts_with("www.") {
        return false;
    }

    // Pure numbers, dates, page references
    if NUMERIC_ONLY.is_match(text) {
        return false;
    }

    // Nothing translatable without letters
    if !text.chars().any(char::is_alphabetic) {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_single_chunk() {
        let segmenter = Segmenter::new(50);
        let chunks = segmenter.segment("  Hello world.  ");
        assert_eq!(chunks, vec!["Hello world.".to_string()]);
    }

    #[test]
    fn test_empty_text_no_chunks() {
        let segmenter = Segmenter::new(50);
        assert!(segmenter.segment("   ").is_empty());
    }

    #[test]
    fn test_chunks_respect_limit() {
        let segmenter = Segmenter::new(50);
        let text = "Hello world. This is a sentence that is deliberately long enough to test splitting behavior across boundaries.";
        let chunks = segmenter.segment(text);

        assert!(chunks.len() >= 2, "expected multiple chunks, got {chunks:?}");
        for chunk in &chunks {
            assert!(
                chunk.chars().count() <= 50,
                "chunk exceeds limit: {chunk:?}"
            );
        }
    }

    #[test]
    fn test_limit_holds_after_chunk_flush() {
        // Sentences sized so the second and third each land exactly one
        // character past what the previous chunk could absorb
        let segmenter = Segmenter::new(9);
        let chunks = segmenter.segment("Abcd. Efgh. Ijk.");

        assert_eq!(chunks, vec!["Abcd.", "Efgh.", "Ijk."]);
        for chunk in &chunks {
            assert!(
                chunk.chars().count() <= 9,
                "chunk exceeds limit: {chunk:?}"
            );
        }
    }

    #[test]
    fn test_rejoined_chunks_preserve_sentence_text() {
        let segmenter = Segmenter::new(50);
        let text = "Hello world. This is a sentence that is deliberately long enough to test splitting behavior across boundaries.";
        let chunks = segmenter.segment(text);
        assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn test_deterministic() {
        let segmenter = Segmenter::new(30);
        let text = "One sentence here. Another sentence there. And a third one too.";
        assert_eq!(segmenter.segment(text), segmenter.segment(text));
    }

    #[test]
    fn test_oversized_sentence_split_on_words() {
        let segmenter = Segmenter::new(20);
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let chunks = segmenter.segment(text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 20, "chunk exceeds limit: {chunk:?}");
            // Never splits inside a word
            for word in chunk.split(' ') {
                assert!(text.contains(word));
            }
        }
        assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn test_single_word_longer_than_limit_kept_whole() {
        let segmenter = Segmenter::new(10);
        let chunks = segmenter.segment("pneumonoultramicroscopicsilicovolcanoconiosis");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], "pneumonoultramicroscopicsilicovolcanoconiosis");
    }

    #[test]
    fn test_sentence_boundaries_with_quotes() {
        let sentences = split_sentences("He said \"stop.\" Then he left! Done? Yes.");
        assert_eq!(sentences.len(), 4);
        assert_eq!(sentences[0], "He said \"stop.\"");
        assert_eq!(sentences[1], "Then he left!");
    }

    #[test]
    fn test_should_translate_normal_text() {
        assert!(should_translate("Hello world"));
        assert!(should_translate("Contact us at support@example.com for help."));
    }

    #[test]
    fn test_should_not_translate_short_or_empty() {
        assert!(!should_translate(""));
        assert!(!should_translate(" "));
        assert!(!should_translate("a"));
    }

    #[test]
    fn test_should_not_translate_email_token() {
        assert!(!should_translate("support@example.com"));
    }

    #[test]
    fn test_should_not_translate_urls() {
        assert!(!should_translate("http://example.com"));
        assert!(!should_translate("https://example.com/page"));
        assert!(!should_translate("www.example.com"));
    }

    #[test]
    fn test_should_not_translate_numeric() {
        assert!(!should_translate("2024-01-15"));
        assert!(!should_translate("3.14, 2.71"));
        assert!(!should_translate("12/31/2023"));
    }

    #[test]
    fn test_should_not_translate_without_letters() {
        assert!(!should_translate("*** --- ***"));
    }
}
