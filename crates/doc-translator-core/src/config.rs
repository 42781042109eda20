use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Language codes following ISO 639-1 with regional variants
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lang(pub String);

impl Lang {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the auto-detect pseudo language
    pub fn is_auto(&self) -> bool {
        self.0 == "auto"
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Lang {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Lang {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// Serde default functions for the language pair
fn default_source_lang() -> Lang {
    Lang::new("auto")
}

fn default_target_lang() -> Lang {
    Lang::new("es")
}

/// Text color used for translated text in PDF overlays
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl TextColor {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub const fn black() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub const fn dark_red() -> Self {
        Self::new(0.8, 0.0, 0.0)
    }

    pub const fn blue() -> Self {
        Self::new(0.0, 0.0, 0.8)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "black" => Some(Self::black()),
            "darkred" | "dark_red" | "dark-red" => Some(Self::dark_red()),
            "blue" => Some(Self::blue()),
            _ => None,
        }
    }
}

impl Default for TextColor {
    fn default() -> Self {
        Self::black()
    }
}

/// Translator backend configuration for OpenAI-compatible APIs.
///
/// Supports llama.cpp, Ollama, DeepSeek, OpenAI, and any other OpenAI-compatible API.
/// Retry behavior lives here because it is a property of how we talk to the
/// external service, not of any one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    pub api_base: String,
    pub api_key: Option<String>,
    pub model: String,
    /// Total attempts per chunk, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay for exponential backoff between attempts
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Ceiling for the longer waits used after rate-limit responses
    #[serde(default = "default_rate_limit_cap_ms")]
    pub rate_limit_cap_ms: u64,
}

impl TranslatorConfig {
    pub fn new(
        api_base: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_base: api_base.into(),
            api_key,
            model: model.into(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            rate_limit_cap_ms: default_rate_limit_cap_ms(),
        }
    }
}

const fn default_max_attempts() -> u32 {
    5
}

const fn default_base_delay_ms() -> u64 {
    1000
}

const fn default_rate_limit_cap_ms() -> u64 {
    30_000
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8080/v1".to_string(),
            api_key: None,
            model: "default_model".to_string(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            rate_limit_cap_ms: default_rate_limit_cap_ms(),
        }
    }
}

/// Segmenter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmenterConfig {
    /// Maximum characters per translation chunk
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,
}

const fn default_max_chunk_size() -> usize {
    4500
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: default_max_chunk_size(),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Enable memory cache
    #[serde(default = "default_true")]
    pub memory_enabled: bool,

    /// Maximum memory cache entries
    #[serde(default = "default_memory_max_entries")]
    pub memory_max_entries: u64,

    /// Memory cache TTL in seconds (0 = no expiry)
    #[serde(default)]
    pub memory_ttl_seconds: u64,

    /// Enable disk cache
    #[serde(default)]
    pub disk_enabled: bool,

    /// Disk cache directory (defaults to .cache/doc-translator)
    pub disk_path: Option<PathBuf>,
}

const fn default_true() -> bool {
    true
}

const fn default_memory_max_entries() -> u64 {
    10_000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_enabled: true,
            memory_max_entries: default_memory_max_entries(),
            memory_ttl_seconds: 0,
            disk_enabled: false,
            disk_path: None,
        }
    }
}

/// Job orchestration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Maximum documents translated concurrently
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Inputs at or below this size run synchronously on the caller's task
    #[serde(default = "default_sync_threshold_bytes")]
    pub sync_threshold_bytes: usize,

    /// Wall-clock ceiling for one job
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,

    /// Job records older than this are swept regardless of status
    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: u64,

    /// Directory for input/output artifacts (defaults to a per-process temp dir)
    pub artifact_dir: Option<PathBuf>,
}

const fn default_max_workers() -> usize {
    3
}

const fn default_sync_threshold_bytes() -> usize {
    2 * 1024 * 1024
}

const fn default_job_timeout_secs() -> u64 {
    30 * 60
}

const fn default_max_age_hours() -> u64 {
    24
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            sync_threshold_bytes: default_sync_threshold_bytes(),
            job_timeout_secs: default_job_timeout_secs(),
            max_age_hours: default_max_age_hours(),
            artifact_dir: None,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Source language
    #[serde(default = "default_source_lang")]
    pub source_lang: Lang,

    /// Target language
    #[serde(default = "default_target_lang")]
    pub target_lang: Lang,

    /// PDF overlay text color
    #[serde(default)]
    pub text_color: TextColor,

    /// Translator backend configuration
    #[serde(default)]
    pub translator: TranslatorConfig,

    /// Segmenter configuration
    #[serde(default)]
    pub segmenter: SegmenterConfig,

    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Job orchestration configuration
    #[serde(default)]
    pub jobs: JobConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source_lang: default_source_lang(),
            target_lang: default_target_lang(),
            text_color: TextColor::default(),
            translator: TranslatorConfig::default(),
            segmenter: SegmenterConfig::default(),
            cache: CacheConfig::default(),
            jobs: JobConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, crate::error::Error> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            crate::error::Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        toml::from_str(&content)
            .map_err(|e| crate::error::Error::ConfigLoad(format!("Failed to parse config: {e}")))
    }

    /// Load from default locations (~/.config/doc-translator/config.toml, ./config.toml)
    pub fn load() -> Self {
        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("doc-translator").join("config.toml");
            if user_config.exists() {
                match Self::from_file(&user_config) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {}", user_config.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        let local_config = std::path::PathBuf::from("config.toml");
        if local_config.exists() {
            match Self::from_file(&local_config) {
                Ok(config) => {
                    tracing::debug!("Loaded config from ./config.toml");
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to load ./config.toml: {}", e);
                }
            }
        }

        tracing::debug!("No config file found, using defaults");
        Self::default()
    }
}

/// Default source language code
pub const DEFAULT_SOURCE_LANG: &str = "auto";
/// Default target language code
pub const DEFAULT_TARGET_LANG: &str = "es";

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.source_lang.as_str(), "auto");
        assert_eq!(config.target_lang.as_str(), "es");
        assert_eq!(config.translator.max_attempts, 5);
        assert_eq!(config.segmenter.max_chunk_size, 4500);
        assert_eq!(config.jobs.max_workers, 3);
        assert_eq!(config.jobs.sync_threshold_bytes, 2 * 1024 * 1024);
    }

    #[test]
    fn test_lang_auto() {
        assert!(Lang::new("auto").is_auto());
        assert!(!Lang::new("en").is_auto());
    }

    #[test]
    fn test_partial_config_parses_with_defaults() {
        let config: AppConfig =
            toml::from_str("target_lang = \"fr\"\n[translator]\napi_base = \"http://x/v1\"\nmodel = \"m\"\n")
                .unwrap();
        assert_eq!(config.target_lang.as_str(), "fr");
        assert_eq!(config.translator.max_attempts, 5);
    }
}
