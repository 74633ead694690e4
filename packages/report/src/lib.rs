#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Normalization and aggregation of NICD hospitalisation report tables.
//!
//! A report goes through these stages:
//!
//! 1. [`nicd_pdf`] detects the table grid on the table page.
//! 2. [`columns`] maps each header to the canonical vocabulary.
//! 3. [`dates`] reads the report date off the date page.
//! 4. [`clean`] keeps known provinces, drops incomplete columns, and
//!    coerces counts to integers.
//! 5. [`aggregate`] sums the provinces into one national record and
//!    collects records into a sorted, deduplicated [`aggregate::TimeSeries`].
//!
//! [`pipeline`] drives those stages over a batch of documents, isolating
//! per-document failures and recording a [`pipeline::RunSummary`].

pub mod aggregate;
pub mod clean;
pub mod columns;
pub mod config;
pub mod dates;
pub mod pipeline;
pub mod progress;
pub mod regions;
pub mod table;

use nicd_report_models::Province;

pub use config::ReportConfig;
pub use dates::DateError;

/// Errors that can occur while turning a report into records.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// The input glob matched no files.
    #[error("No input files matched '{pattern}'")]
    NoInput {
        /// The full glob pattern that was searched.
        pattern: String,
    },

    /// The input glob pattern is invalid.
    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// The document could not be decoded, or its table page has no grid.
    #[error(transparent)]
    Pdf(#[from] nicd_pdf::PdfError),

    /// The report date could not be determined.
    #[error("Report date unavailable: {0}")]
    Date(#[from] DateError),

    /// The extracted table has no column that normalizes to `province`.
    #[error("Table has no province column (header: {header:?})")]
    MissingProvinceColumn {
        /// The normalized header that was found instead.
        header: Vec<String>,
    },

    /// No row of the table names a recognized province.
    #[error("Table contains no recognised province rows")]
    NoRegions,

    /// A retained column holds a value that is not an integer count.
    #[error("Column '{column}' has non-numeric value '{value}' for {province}")]
    TypeCoercion {
        /// Normalized column name.
        column: String,
        /// The offending cell text.
        value: String,
        /// The row's province.
        province: Province,
    },

    /// Summing a column across provinces exceeded the `i64` range.
    #[error("Sum of column '{column}' overflows for {date}")]
    CountOverflow {
        /// Normalized column name.
        column: String,
        /// Report date of the rows being summed.
        date: chrono::NaiveDate,
    },

    /// A configuration or vocabulary file is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReportError {
    /// Returns `true` for failures confined to a single document.
    ///
    /// Recoverable failures skip the document and let the batch continue.
    /// Everything else signals that an assumption about the report format
    /// no longer holds and aborts the run.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Pdf(_) | Self::Date(_) | Self::MissingProvinceColumn { .. } | Self::NoRegions
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coercion_errors_are_not_recoverable() {
        let err = ReportError::TypeCoercion {
            column: "died_to_date".to_string(),
            value: "n/a".to_string(),
            province: Province::Gauteng,
        };
        assert!(!err.is_recoverable());
        assert!(!ReportError::CountOverflow {
            column: "admissions_to_date".to_string(),
            date: chrono::NaiveDate::from_ymd_opt(2021, 7, 14).unwrap(),
        }
        .is_recoverable());
        assert!(!ReportError::NoInput {
            pattern: "*.pdf".to_string()
        }
        .is_recoverable());
    }

    #[test]
    fn document_level_errors_are_recoverable() {
        assert!(ReportError::NoRegions.is_recoverable());
        assert!(ReportError::Date(DateError::NoText).is_recoverable());
        assert!(ReportError::Pdf(nicd_pdf::PdfError::NoTable { index: 1 }).is_recoverable());
    }
}
