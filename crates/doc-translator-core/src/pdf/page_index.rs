//! Validated page index bridging usize, mupdf's i32, and lopdf's 1-based u32.

use std::fmt;

use crate::error::Error;

/// A zero-based page index validated against a document's page count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageIndex(i32);

impl PageIndex {
    /// Validate a zero-based page number against the total page count.
    pub fn try_from_page_num(page_num: usize, total_pages: usize) -> Result<Self, Error> {
        if page_num >= total_pages {
            return Err(Error::PdfInvalidPage {
                page: page_num,
                total: total_pages,
            });
        }

        let index = i32::try_from(page_num).map_err(|_| Error::PdfInvalidPage {
            page: page_num,
            total: total_pages,
        })?;

        Ok(Self(index))
    }

    /// The 1-based page number lopdf's page map uses.
    #[must_use]
    pub const fn as_lopdf_page_number(self) -> u32 {
        (self.0 + 1).cast_unsigned()
    }
}

impl From<PageIndex> for i32 {
    fn from(index: PageIndex) -> Self {
        index.0
    }
}

impl fmt::Display for PageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_page_num() {
        let idx = PageIndex::try_from_page_num(5, 10).unwrap();
        assert_eq!(i32::from(idx), 5);
        assert_eq!(idx.as_lopdf_page_number(), 6);
    }

    #[test]
    fn test_out_of_range_page_num() {
        assert!(PageIndex::try_from_page_num(10, 5).is_err());
        assert!(PageIndex::try_from_page_num(5, 5).is_err());
    }

    #[test]
    fn test_first_page_is_lopdf_one() {
        let idx = PageIndex::try_from_page_num(0, 1).unwrap();
        assert_eq!(idx.as_lopdf_page_number(), 1);
    }
}
