use std::path::Path;
use std::sync::Arc;

use mupdf::Document as MuDocument;

use crate::error::{Error, Result};

/// Thread-safe wrapper around a loaded PDF.
///
/// Holds the raw bytes behind an `Arc`; mupdf handles are not `Send`, so
/// each operation opens a short-lived handle from the bytes instead.
#[derive(Clone)]
pub struct PdfDocument {
    bytes: Arc<Vec<u8>>,
    page_count: usize,
}

impl PdfDocument {
    /// Parse a PDF from bytes, validating it and counting pages.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();

        let doc = MuDocument::from_bytes(&bytes, "")
            .map_err(|e| Error::PdfOpen(format!("not a valid PDF: {e}")))?;

        let page_count = doc
            .page_count()
            .map_err(|e| Error::PdfOpen(format!("failed to get page count: {e}")))?;

        Ok(Self {
            bytes: Arc::new(bytes),
            page_count: usize::try_from(page_count).unwrap_or(0),
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref()).map_err(|e| {
            Error::PdfOpen(format!("failed to read {}: {e}", path.as_ref().display()))
        })?;
        Self::from_bytes(bytes)
    }

    pub const fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Open a fresh mupdf handle for extraction work.
    pub(crate) fn open_document(&self) -> Result<MuDocument> {
        MuDocument::from_bytes(&self.bytes, "")
            .map_err(|e| Error::PdfOpen(format!("failed to open document: {e}")))
    }
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("page_count", &self.page_count)
            .field("bytes_len", &self.bytes.len())
            .finish()
    }
}
