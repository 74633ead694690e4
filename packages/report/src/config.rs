//! Run configuration for report extraction.
//!
//! Defaults match the report template used since 2020: the report date is
//! on the first page and the province table on the second. A TOML file can
//! override any field:
//!
//! ```toml
//! table_page = 1
//! date_page = 0
//! date_token_count = 12
//! include_total = false
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::ReportError;

/// Page indices and policy toggles for one extraction run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    /// Zero-based index of the page carrying the province table.
    pub table_page: usize,
    /// Zero-based index of the page carrying the report date.
    pub date_page: usize,
    /// How many leading words of the date page are searched for the date.
    ///
    /// Must cover the longest title line of any template revision.
    pub date_token_count: usize,
    /// Whether a precomputed `Total` row is kept and summed with the
    /// provinces.
    pub include_total: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            table_page: 1,
            date_page: 0,
            date_token_count: 12,
            include_total: false,
        }
    }
}

impl ReportConfig {
    /// Parses a configuration from TOML. Missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Config`] if the TOML is malformed or names an
    /// unknown field.
    pub fn from_toml(toml_str: &str) -> Result<Self, ReportError> {
        toml::de::from_str(toml_str).map_err(|e| ReportError::Config {
            message: e.to_string(),
        })
    }

    /// Reads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Io`] if the file cannot be read, or
    /// [`ReportError::Config`] if it is invalid.
    pub fn load(path: &Path) -> Result<Self, ReportError> {
        let contents = std::fs::read_to_string(path)?;
        log::debug!("Loaded report config from {}", path.display());
        Self::from_toml(&contents)
    }
}
