//! Subcommand implementations.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use nicd_cli_utils::{IndicatifProgress, MultiProgress};
use nicd_database::{csv_output, paths, store};
use nicd_pdf::{DocumentLoader as _, FsLoader};
use nicd_report::pipeline::{self, RunFailure, RunSummary, SkippedDocument};
use nicd_report::regions::RegionTable;
use nicd_report::{ReportConfig, ReportError, clean};

use crate::Store;

/// Loads the run configuration, applying command-line overrides.
///
/// # Errors
///
/// Returns [`ReportError`] if the file cannot be read or is invalid.
pub fn load_config(path: Option<&Path>, include_total: bool) -> Result<ReportConfig, ReportError> {
    let mut config = match path {
        Some(path) => ReportConfig::load(path)?,
        None => ReportConfig::default(),
    };
    if include_total {
        config.include_total = true;
    }
    Ok(config)
}

/// Prints the counts of an aborted run and returns its error.
fn aborted(failure: RunFailure) -> Box<dyn std::error::Error> {
    if failure.summary.attempted > 0 {
        println!("{}", failure.summary);
    }
    failure.error.into()
}

/// Downloads the reports for `start..end`.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built or a download
/// fails for a reason other than a missing file.
pub async fn fetch(
    multi: &MultiProgress,
    start: NaiveDate,
    end: Option<NaiveDate>,
    dir: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = dir.unwrap_or_else(paths::reports_dir);
    let dates = nicd_fetch::date_range(start, end);
    let client = nicd_fetch::build_client()?;

    let progress = IndicatifProgress::steps_bar(multi, "Fetching reports", dates.len() as u64);
    let mut found = 0usize;

    for date in &dates {
        progress.set_message(date.to_string());
        found += nicd_fetch::fetch_reports(&client, *date, &dir).await?.len();
        progress.inc(1);
    }

    progress.finish(format!("{found} of {} days available", dates.len()));
    println!("{found} reports in {}", dir.display());
    Ok(())
}

/// Writes each report's normalized province table as CSV.
///
/// Documents without a usable table are skipped and recorded in the
/// returned summary.
///
/// # Errors
///
/// Returns an error if no documents match or output cannot be written.
pub fn scrape(
    multi: &MultiProgress,
    dir: Option<PathBuf>,
    pattern: &str,
    page: Option<usize>,
    out: Option<PathBuf>,
    include_total: bool,
) -> Result<RunSummary, Box<dyn std::error::Error>> {
    let dir = dir.unwrap_or_else(paths::reports_dir);
    let page = page.unwrap_or(ReportConfig::default().table_page);
    let documents = pipeline::discover_documents(&dir, pattern)?;

    let progress = IndicatifProgress::documents_bar(multi, "Scraping tables");
    progress.set_total(documents.len() as u64);

    let mut summary = RunSummary::default();

    for path in documents {
        summary.attempted += 1;
        progress.set_message(path.display().to_string());

        let table = FsLoader
            .load(&path)
            .map_err(ReportError::from)
            .and_then(|doc| pipeline::table_for(&doc, page))
            .and_then(|table| clean::region_table(table, RegionTable::builtin(), include_total));
        progress.inc(1);

        let table = match table {
            Ok(table) => table,
            Err(e) if e.is_recoverable() => {
                log::warn!("Skipping {}: {e}", path.display());
                summary.skipped.push(SkippedDocument {
                    path,
                    reason: e.to_string(),
                });
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        match &out {
            Some(out_dir) => {
                let stem = path.file_stem().map_or_else(
                    || "report".to_string(),
                    |s| s.to_string_lossy().into_owned(),
                );
                let target = out_dir.join(format!("{stem}.csv"));
                csv_output::write_table_file(&target, &table)?;
                log::info!("Wrote {}", target.display());
            }
            None => {
                println!("# {}", path.display());
                csv_output::write_table(std::io::stdout().lock(), &table)?;
            }
        }
        summary.contributed += 1;
    }

    progress.finish(format!(
        "{} of {} tables written",
        summary.contributed, summary.attempted
    ));
    Ok(summary)
}

/// Builds the national time series and writes it to `sink`.
///
/// # Errors
///
/// Returns an error if no documents match, a value cannot be coerced, or
/// the output cannot be written.
pub fn extract(
    multi: &MultiProgress,
    dir: Option<PathBuf>,
    pattern: &str,
    config: &ReportConfig,
    sink: Store,
    output: Option<PathBuf>,
    per_report: bool,
) -> Result<RunSummary, Box<dyn std::error::Error>> {
    let dir = dir.unwrap_or_else(paths::reports_dir);
    let progress = IndicatifProgress::documents_bar(multi, "Extracting reports");
    let (series, summary) =
        pipeline::run_national(&dir, pattern, &FsLoader, config, progress).map_err(aborted)?;

    match sink {
        Store::Csv if per_report => {
            let out_dir = output.unwrap_or_else(paths::output_dir);
            let written = csv_output::write_per_report(&out_dir, &series)?;
            println!("Wrote {} files to {}", written.len(), out_dir.display());
        }
        Store::Csv => {
            let path = output.unwrap_or_else(paths::national_csv_path);
            csv_output::write_time_series_file(&path, &series)?;
            println!("Wrote {} records to {}", series.len(), path.display());
        }
        Store::Duckdb => {
            let path = output.unwrap_or_else(paths::national_db_path);
            let conn = store::open(&path, store::Granularity::National)?;
            if let Some(latest) = store::latest_date(&conn)? {
                log::info!("Database already holds records up to {latest}");
            }
            let inserted = store::insert_national(&conn, series.records())?;
            println!(
                "Inserted {inserted} of {} records into {}",
                series.len(),
                path.display()
            );
        }
        Store::None => {
            csv_output::write_time_series(std::io::stdout().lock(), &series)?;
        }
    }

    Ok(summary)
}

/// Appends province-level rows to the province database.
///
/// # Errors
///
/// Returns an error if no documents match, a value cannot be coerced, or
/// the database cannot be written.
pub fn provinces(
    multi: &MultiProgress,
    dir: Option<PathBuf>,
    pattern: &str,
    config: &ReportConfig,
    database: Option<PathBuf>,
) -> Result<RunSummary, Box<dyn std::error::Error>> {
    let dir = dir.unwrap_or_else(paths::reports_dir);
    let progress = IndicatifProgress::documents_bar(multi, "Extracting provinces");
    let (records, summary) =
        pipeline::run_provinces(&dir, pattern, &FsLoader, config, progress).map_err(aborted)?;

    let path = database.unwrap_or_else(paths::province_db_path);
    let conn = store::open(&path, store::Granularity::Province)?;
    let inserted = store::insert_provinces(&conn, &records)?;
    println!(
        "Inserted {inserted} of {} province rows into {} ({} stored)",
        records.len(),
        path.display(),
        store::record_count(&conn)?
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aborted_run_returns_the_underlying_error() {
        let failure = RunFailure {
            error: ReportError::NoRegions,
            summary: RunSummary {
                attempted: 2,
                contributed: 1,
                skipped: Vec::new(),
            },
        };
        let err = aborted(failure);
        assert_eq!(err.to_string(), ReportError::NoRegions.to_string());
    }

    #[test]
    fn include_total_flag_overrides_defaults() {
        let config = load_config(None, true).unwrap();
        assert!(config.include_total);
        assert_eq!(config.table_page, ReportConfig::default().table_page);
    }

    #[test]
    fn config_file_is_loaded() {
        let path = std::env::temp_dir().join(format!("nicd_cli_config_{}.toml", std::process::id()));
        std::fs::write(&path, "table_page = 2\ndate_token_count = 20\n").unwrap();

        let config = load_config(Some(path.as_path()), false).unwrap();
        assert_eq!(config.table_page, 2);
        assert_eq!(config.date_token_count, 20);
        assert!(!config.include_total);

        std::fs::remove_file(&path).unwrap();
    }
}
