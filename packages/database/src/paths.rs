#![allow(clippy::module_name_repetitions)]
//! Default locations under the project's `data/` directory.
//!
//! Every command accepts an explicit path; these are only the fallbacks.

use std::path::{Path, PathBuf};

/// Returns the workspace root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`.
///
/// # Panics
///
/// Panics if the project root cannot be resolved.
#[must_use]
pub fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .expect("Failed to find project root from CARGO_MANIFEST_DIR")
        .to_path_buf()
}

/// Returns the `data/` directory path.
#[must_use]
pub fn data_dir() -> PathBuf {
    project_root().join("data")
}

/// Returns the `data/reports/` directory where downloaded PDFs are kept.
#[must_use]
pub fn reports_dir() -> PathBuf {
    data_dir().join("reports")
}

/// Returns the `data/output/` directory for CSV output.
#[must_use]
pub fn output_dir() -> PathBuf {
    data_dir().join("output")
}

/// Returns the default combined time series CSV path.
#[must_use]
pub fn national_csv_path() -> PathBuf {
    output_dir().join("nicd_hospitalisation.csv")
}

/// Returns the national `DuckDB` file.
#[must_use]
pub fn national_db_path() -> PathBuf {
    data_dir().join("nicd.duckdb")
}

/// Returns the province-level `DuckDB` file.
#[must_use]
pub fn province_db_path() -> PathBuf {
    data_dir().join("nicd_provinces.duckdb")
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
