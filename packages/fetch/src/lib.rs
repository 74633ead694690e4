#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Downloads daily NICD hospitalisation reports.
//!
//! Reports are published under a month-dated upload directory with file
//! names that changed over time. For each date, every known file name
//! (`data/templates.toml`) is tried in order; a 404 moves on to the next
//! name and the first successful download is kept.

pub mod retry;

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;

const TEMPLATES_TOML: &str = include_str!("../data/templates.toml");

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

static BUILTIN: LazyLock<Templates> = LazyLock::new(|| {
    Templates::from_toml(TEMPLATES_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse templates.toml: {e}"))
});

/// Errors that can occur while downloading reports.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status} for {url}")]
    Status {
        /// Requested URL.
        url: String,
        /// Response status code.
        status: u16,
    },

    /// The templates file is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Returns `true` if the server reported the file does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

/// URL base and file-name patterns for published reports.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Templates {
    /// strftime pattern of the upload directory, ending in `/`.
    pub url_base: String,
    /// strftime patterns of historical file names, most likely first.
    pub file_names: Vec<String>,
}

impl Templates {
    /// Returns the templates embedded at compile time.
    ///
    /// # Panics
    ///
    /// Panics if the embedded `templates.toml` is malformed.
    #[must_use]
    pub fn builtin() -> &'static Self {
        &BUILTIN
    }

    /// Parses templates from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Config`] if the TOML is malformed or lists no
    /// file names.
    pub fn from_toml(toml_str: &str) -> Result<Self, FetchError> {
        let templates: Self = toml::de::from_str(toml_str).map_err(|e| FetchError::Config {
            message: e.to_string(),
        })?;
        if templates.file_names.is_empty() {
            return Err(FetchError::Config {
                message: "no file names listed".to_string(),
            });
        }
        Ok(templates)
    }

    /// Expands every file-name template for `date`, in order.
    #[must_use]
    pub fn report_urls(&self, date: NaiveDate) -> Vec<ReportUrl> {
        let base = date.format(&self.url_base).to_string();
        self.file_names
            .iter()
            .map(|template| {
                let file_name = date.format(template).to_string();
                ReportUrl {
                    url: format!("{base}{file_name}"),
                    file_name,
                }
            })
            .collect()
    }
}

/// One candidate location of a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportUrl {
    /// File name, also used for the local copy.
    pub file_name: String,
    /// Full download URL.
    pub url: String,
}

/// Expands the builtin templates for `date`.
#[must_use]
pub fn report_urls(date: NaiveDate) -> Vec<ReportUrl> {
    Templates::builtin().report_urls(date)
}

/// Every day from `start` up to but excluding `end`; only `start` when
/// `end` is `None`.
#[must_use]
pub fn date_range(start: NaiveDate, end: Option<NaiveDate>) -> Vec<NaiveDate> {
    let Some(end) = end else {
        return vec![start];
    };
    start
        .iter_days()
        .take_while(|d| *d < end)
        .collect()
}

/// Builds the HTTP client used for downloads.
///
/// # Errors
///
/// Returns [`FetchError::Http`] if the client cannot be constructed.
pub fn build_client() -> Result<reqwest::Client, FetchError> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(120))
        .build()?)
}

/// Downloads the report for `date` into `dir`.
///
/// A file already present in `dir` under any known name is reused without
/// a request. Otherwise each URL is tried in order until one succeeds.
/// Returns the local paths for the date (empty if no name exists on the
/// server).
///
/// # Errors
///
/// Returns [`FetchError`] for failures other than a missing file.
pub async fn fetch_reports(
    client: &reqwest::Client,
    date: NaiveDate,
    dir: &Path,
) -> Result<Vec<PathBuf>, FetchError> {
    let urls = report_urls(date);

    if let Some(existing) = urls
        .iter()
        .map(|u| dir.join(&u.file_name))
        .find(|p| p.exists())
    {
        log::info!("File exists: {}", existing.display());
        return Ok(vec![existing]);
    }

    for candidate in &urls {
        log::debug!("URL: {}", candidate.url);
        match retry::send_bytes(|| client.get(&candidate.url)).await {
            Ok(bytes) => {
                tokio::fs::create_dir_all(dir).await?;
                let path = dir.join(&candidate.file_name);
                tokio::fs::write(&path, &bytes).await?;
                log::info!(
                    "Fetched {} ({} bytes)",
                    candidate.file_name,
                    bytes.len()
                );
                return Ok(vec![path]);
            }
            Err(e) if e.is_not_found() => {
                log::debug!("Not found: {}", candidate.file_name);
            }
            Err(e) => return Err(e),
        }
    }

    log::warn!("No report found for {date}");
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn builtin_templates_expand_dates() {
        let urls = report_urls(ymd(2021, 7, 4));
        assert_eq!(urls.len(), Templates::builtin().file_names.len());
        assert_eq!(
            urls[0].url,
            "https://www.nicd.ac.za/wp-content/uploads/2021/07/\
             NICD-COVID-19-Daily-Sentinel-Hospital-Surveillance-report-National-20210704.pdf"
        );
        assert!(urls.iter().all(|u| u.url.ends_with(&u.file_name)));
    }

    #[test]
    fn date_range_excludes_end() {
        assert_eq!(
            date_range(ymd(2021, 7, 30), Some(ymd(2021, 8, 2))),
            vec![ymd(2021, 7, 30), ymd(2021, 7, 31), ymd(2021, 8, 1)]
        );
        assert_eq!(date_range(ymd(2021, 7, 30), None), vec![ymd(2021, 7, 30)]);
        assert!(date_range(ymd(2021, 7, 30), Some(ymd(2021, 7, 30))).is_empty());
    }

    #[test]
    fn templates_require_file_names() {
        let toml_str = "url_base = \"https://example.org/\"\nfile_names = []";
        assert!(matches!(
            Templates::from_toml(toml_str),
            Err(FetchError::Config { .. })
        ));
    }

    #[test]
    fn not_found_is_distinguished() {
        let missing = FetchError::Status {
            url: "https://example.org/a.pdf".to_string(),
            status: 404,
        };
        let forbidden = FetchError::Status {
            url: "https://example.org/a.pdf".to_string(),
            status: 403,
        };
        assert!(missing.is_not_found());
        assert!(!forbidden.is_not_found());
    }

    #[tokio::test]
    async fn existing_local_file_is_reused() {
        let dir = std::env::temp_dir().join(format!("nicd_fetch_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let date = ymd(2021, 7, 4);
        let local = dir.join(&report_urls(date)[1].file_name);
        std::fs::write(&local, b"%PDF-1.4").unwrap();

        let client = build_client().unwrap();
        let paths = fetch_reports(&client, date, &dir).await.unwrap();
        assert_eq!(paths, vec![local]);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
