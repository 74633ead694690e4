#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! PDF decoding and table extraction for NICD situational reports.
//!
//! Reports are decoded page by page with pure-Rust text extraction
//! ([`pdf_extract`]). The text of each page preserves the horizontal layout
//! of the original table closely enough that columns are separated by runs
//! of spaces, which [`text_table`] turns back into a grid of cells.
//!
//! The primary entry points are [`PdfDocument`] (one decoded report) and
//! [`DocumentLoader`], the seam the pipeline uses to open documents so that
//! tests can substitute in-memory pages.

pub mod text_table;

use std::path::Path;

pub use text_table::{RawTable, extract_table};

/// Errors specific to PDF decoding and table extraction.
#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    /// PDF text extraction failed.
    #[error("PDF extraction error: {0}")]
    Extraction(String),

    /// The requested page does not exist in the document.
    #[error("Page {index} out of range (document has {count} pages)")]
    PageOutOfRange {
        /// Zero-based page index that was requested.
        index: usize,
        /// Number of pages in the document.
        count: usize,
    },

    /// No rectangular grid of text was found on the page.
    #[error("No table found on page {index}")]
    NoTable {
        /// Zero-based page index that was searched.
        index: usize,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A decoded report: the plain text of every page, in order.
///
/// Holds no file handle or parser state once constructed; dropping it
/// releases everything associated with the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfDocument {
    pages: Vec<String>,
}

impl PdfDocument {
    /// Builds a document from already-decoded page texts.
    #[must_use]
    pub const fn from_pages(pages: Vec<String>) -> Self {
        Self { pages }
    }

    /// Decodes a PDF held in memory.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::Extraction`] if the PDF cannot be decoded. Panics
    /// raised inside the decoder on malformed input are caught and reported
    /// the same way.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PdfError> {
        let result =
            std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes));

        let pages = match result {
            Ok(Ok(pages)) => pages,
            Ok(Err(e)) => {
                return Err(PdfError::Extraction(format!(
                    "failed to extract text from PDF: {e}"
                )));
            }
            Err(_) => {
                return Err(PdfError::Extraction(
                    "PDF decoder panicked on malformed input".to_string(),
                ));
            }
        };

        log::debug!("Decoded {} pages", pages.len());

        Ok(Self { pages })
    }

    /// Reads and decodes a PDF file.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::Io`] if the file cannot be read, or
    /// [`PdfError::Extraction`] if it cannot be decoded.
    pub fn open(path: &Path) -> Result<Self, PdfError> {
        let bytes = std::fs::read(path)?;
        log::debug!("Read {} bytes from {}", bytes.len(), path.display());
        Self::from_bytes(&bytes)
    }

    /// Returns the text of the page at `index` (zero-based).
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::PageOutOfRange`] if the page does not exist.
    pub fn page_text(&self, index: usize) -> Result<&str, PdfError> {
        self.pages
            .get(index)
            .map(String::as_str)
            .ok_or(PdfError::PageOutOfRange {
                index,
                count: self.pages.len(),
            })
    }

    /// Extracts the largest table on the page at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::PageOutOfRange`] if the page does not exist, or
    /// [`PdfError::NoTable`] if the page has no grid of text.
    pub fn extract_table(&self, index: usize) -> Result<RawTable, PdfError> {
        let text = self.page_text(index)?;
        extract_table(text).ok_or(PdfError::NoTable { index })
    }
}

/// Opens documents for the extraction pipeline.
pub trait DocumentLoader {
    /// Loads and decodes the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError`] if the document cannot be read or decoded.
    fn load(&self, path: &Path) -> Result<PdfDocument, PdfError>;
}

/// Loads documents from the local filesystem with [`PdfDocument::open`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLoader;

impl DocumentLoader for FsLoader {
    fn load(&self, path: &Path) -> Result<PdfDocument, PdfError> {
        PdfDocument::open(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_out_of_range_is_reported() {
        let doc = PdfDocument::from_pages(vec!["only page".to_string()]);
        let err = doc.page_text(3).unwrap_err();
        assert!(matches!(
            err,
            PdfError::PageOutOfRange { index: 3, count: 1 }
        ));
    }

    #[test]
    fn page_without_grid_is_no_table() {
        let doc = PdfDocument::from_pages(vec![
            "14 July 2021".to_string(),
            "Just a paragraph of prose with single spaces.".to_string(),
        ]);
        assert!(matches!(
            doc.extract_table(1),
            Err(PdfError::NoTable { index: 1 })
        ));
    }

    #[test]
    fn garbage_bytes_fail_extraction() {
        let err = PdfDocument::from_bytes(b"not a pdf").unwrap_err();
        assert!(matches!(err, PdfError::Extraction(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let path = std::env::temp_dir().join("nicd_pdf_missing_file_test.pdf");
        let _ = std::fs::remove_file(&path);
        assert!(matches!(FsLoader.load(&path), Err(PdfError::Io(_))));
    }
}
