use thiserror::Error;

/// Unified error type for doc-translator-core
///
/// This enum encompasses all error cases that can occur in the library:
/// - Document operations (opening, parsing, rewriting, saving)
/// - Translation operations (API requests, responses, rate limiting)
/// - Cache operations (initialization, reading, writing)
/// - Job operations (lookup, cancellation, timeout)
/// - Configuration and general I/O operations
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // Document Errors
    // ==========================================================================
    /// Input bytes are not a supported document format
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// Failed to open or parse a PDF file
    #[error("failed to open PDF: {0}")]
    PdfOpen(String),

    /// Invalid page number requested
    #[error("invalid page number {page} (document has {total} pages)")]
    PdfInvalidPage { page: usize, total: usize },

    /// Failed to extract text from a PDF page
    #[error("failed to extract text from page {page}: {reason}")]
    PdfTextExtraction { page: usize, reason: String },

    /// Failed to create a PDF overlay
    #[error("failed to create PDF overlay: {0}")]
    PdfOverlay(String),

    /// Failed to save a PDF
    #[error("failed to save PDF: {0}")]
    PdfSave(String),

    /// Error from the lopdf library
    #[error("lopdf error: {0}")]
    Lopdf(String),

    /// Failed to open or repack the DOCX container (ZIP)
    #[error("DOCX container error: {0}")]
    DocxContainer(String),

    /// Failed to parse or rewrite a DOCX XML part
    #[error("DOCX XML error in {part}: {reason}")]
    DocxXml { part: String, reason: String },

    // ==========================================================================
    // Translation Errors
    // ==========================================================================
    /// Translation API request failed
    #[error("translation API request failed: {0}")]
    TranslationRequest(String),

    /// Invalid response from translation API
    #[error("invalid translation API response: {0}")]
    TranslationInvalidResponse(String),

    /// Rate limited by translation API
    #[error("translation rate limited{}", retry_after.map(|s| format!(", retry after {s} seconds")).unwrap_or_default())]
    TranslationRateLimited { retry_after: Option<u64> },

    /// Translation request timed out
    #[error("translation request timed out")]
    TranslationTimeout,

    /// Maximum retry attempts exceeded for translation
    #[error("translation failed after maximum retries")]
    TranslationMaxRetriesExceeded,

    // ==========================================================================
    // Cache Errors
    // ==========================================================================
    /// Failed to initialize the cache
    #[error("failed to initialize cache: {0}")]
    CacheInit(String),

    /// Failed to write to cache
    #[error("failed to write to cache: {0}")]
    CacheWrite(String),

    // ==========================================================================
    // Job Errors
    // ==========================================================================
    /// No job with the given id exists in the registry
    #[error("job not found: {0}")]
    JobNotFound(String),

    /// Cancellation was requested for a job that already reached a terminal state
    #[error("job {id} already finished with status {status}")]
    JobFinished { id: String, status: String },

    /// Job exceeded its wall-clock processing ceiling
    #[error("job timed out after {seconds} seconds")]
    JobTimeout { seconds: u64 },

    /// Job was cancelled while processing
    #[error("job cancelled")]
    Cancelled,

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
