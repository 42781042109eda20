mod client;
mod openai;
mod retry;
mod traits;

pub use client::TranslationClient;
pub use openai::OpenAiTranslator;
pub use retry::RetryPolicy;
pub use traits::{Translator, TranslatorInfo};

use std::sync::Arc;

use crate::config::TranslatorConfig;
use crate::error::Result;

/// Create a translator backend from configuration.
pub fn create_translator(config: &TranslatorConfig) -> Result<Arc<dyn Translator>> {
    Ok(Arc::new(OpenAiTranslator::new(config)?))
}
