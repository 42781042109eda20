mod document;
mod page_index;
mod text;
pub mod overlay;

pub use document::PdfDocument;
pub use overlay::{OverlayOptions, PdfOverlay, TranslationOverlay};
pub use page_index::PageIndex;
pub use text::{BoundingBox, TextBlock, TextExtractor};
