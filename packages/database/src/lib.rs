#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Persistence for extracted hospitalisation records.
//!
//! Two sinks are supported: CSV files ([`csv_output`]) and a local `DuckDB`
//! database ([`store`]). Both are append-friendly: re-running an extraction
//! over the same reports does not duplicate stored rows.

pub mod csv_output;
pub mod paths;
pub mod store;

/// Errors that can occur while persisting records.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// `DuckDB` error.
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// CSV serialization error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A stored value could not be converted back.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
