//! Format-preserving document rewriters.
//!
//! A rewriter takes document bytes and a [`crate::TranslationClient`], and
//! produces new bytes with translatable text replaced and everything else
//! (images, styles, layout) left intact.

mod docx;
mod pdf;

pub use docx::DocxRewriter;
pub use pdf::PdfRewriter;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Docx,
    Pdf,
}

impl DocumentFormat {
    /// Detect from a file extension.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        match path
            .as_ref()
            .extension()?
            .to_str()?
            .to_ascii_lowercase()
            .as_str()
        {
            "docx" => Some(Self::Docx),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Detect from magic bytes: DOCX is a ZIP container, PDF starts with
    /// `%PDF`.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"%PDF") {
            Some(Self::Pdf)
        } else if bytes.starts_with(b"PK\x03\x04") {
            Some(Self::Docx)
        } else {
            None
        }
    }

    pub const fn extension(self) -> &'static str {
        match self {
            Self::Docx => "docx",
            Self::Pdf => "pdf",
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Cooperative cancellation and progress reporting for a rewrite.
///
/// The cancel flag is checked between translation units, so cancellation
/// takes effect at the next unit boundary. Progress is reported as
/// `(translated_chunks, total_chunks)`.
#[derive(Default)]
pub struct RewriteControl {
    cancel: Arc<AtomicBool>,
    progress: Option<Box<dyn Fn(usize, usize) + Send + Sync>>,
}

impl RewriteControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(cancel: Arc<AtomicBool>) -> Self {
        Self {
            cancel,
            progress: None,
        }
    }

    #[must_use]
    pub fn on_progress(mut self, f: impl Fn(usize, usize) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(f));
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Error out if cancellation was requested.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn report(&self, done: usize, total: usize) {
        if let Some(ref f) = self.progress {
            f(done, total);
        }
    }
}

impl std::fmt::Debug for RewriteControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RewriteControl")
            .field("cancelled", &self.cancelled())
            .field("has_progress", &self.progress.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            DocumentFormat::from_path("report.docx"),
            Some(DocumentFormat::Docx)
        );
        assert_eq!(
            DocumentFormat::from_path("/tmp/Report.PDF"),
            Some(DocumentFormat::Pdf)
        );
        assert_eq!(DocumentFormat::from_path("notes.txt"), None);
        assert_eq!(DocumentFormat::from_path("noextension"), None);
    }

    #[test]
    fn test_format_detect_magic() {
        assert_eq!(
            DocumentFormat::detect(b"%PDF-1.5 rest"),
            Some(DocumentFormat::Pdf)
        );
        assert_eq!(
            DocumentFormat::detect(b"PK\x03\x04rest"),
            Some(DocumentFormat::Docx)
        );
        assert_eq!(DocumentFormat::detect(b"plain text"), None);
    }

    #[test]
    fn test_cancel_check() {
        let ctrl = RewriteControl::new();
        assert!(ctrl.check_cancelled().is_ok());

        ctrl.cancel_flag().store(true, Ordering::SeqCst);
        assert!(matches!(ctrl.check_cancelled(), Err(Error::Cancelled)));
    }
}
