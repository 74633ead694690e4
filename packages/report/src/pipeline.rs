//! Batch extraction over a directory of reports.
//!
//! Documents are processed one at a time in sorted path order. A document
//! that cannot be read, has no table, has no date or has no province rows
//! is skipped and recorded in the [`RunSummary`]; a value that cannot be
//! coerced to a count stops the run, since it means the report layout has
//! changed in a way the vocabularies do not cover.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use nicd_pdf::{DocumentLoader, PdfDocument};
use nicd_report_models::{NationalRecord, ProvinceRecord, RegionRow};

use crate::ReportError;
use crate::aggregate::{self, TimeSeries};
use crate::clean;
use crate::columns::ColumnAliases;
use crate::config::ReportConfig;
use crate::dates;
use crate::progress::ProgressCallback;
use crate::regions::RegionTable;
use crate::table::Table;

/// Lists the documents in `dir` matching `pattern`, sorted by path.
///
/// Only `pattern` is interpreted as a glob; `dir` is matched literally.
///
/// # Errors
///
/// * [`ReportError::Pattern`] if the pattern is invalid
/// * [`ReportError::NoInput`] if nothing matches
pub fn discover_documents(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, ReportError> {
    let escaped = glob::Pattern::escape(&dir.to_string_lossy());
    let full = Path::new(&escaped).join(pattern).to_string_lossy().into_owned();

    let mut paths: Vec<PathBuf> = glob::glob(&full)?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                log::warn!("Skipping unreadable path: {e}");
                None
            }
        })
        .filter(|p| p.is_file())
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(ReportError::NoInput { pattern: full });
    }

    log::info!("Found {} documents matching {full}", paths.len());
    Ok(paths)
}

/// The cleaned province rows of one report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    /// Where the report was read from.
    pub path: PathBuf,
    /// Report date.
    pub date: NaiveDate,
    /// Cleaned province rows.
    pub rows: Vec<RegionRow>,
    /// The rows summed into this report's national record.
    pub national: NationalRecord,
}

impl ExtractedDocument {
    /// The rows as dated province records.
    #[must_use]
    pub fn province_records(&self) -> Vec<ProvinceRecord> {
        aggregate::province_records(&self.rows, self.date)
    }
}

/// Extracts and normalizes the table on `page` of a document.
///
/// # Errors
///
/// Returns [`ReportError::Pdf`] if the page is missing or has no table.
pub fn table_for(doc: &PdfDocument, page: usize) -> Result<Table, ReportError> {
    let raw = doc.extract_table(page)?;
    if raw.rejected_rows() > 0 {
        log::warn!(
            "Dropped {} malformed rows from the table on page {page}",
            raw.rejected_rows()
        );
    }
    Ok(Table::from_raw(raw, ColumnAliases::builtin()))
}

/// Runs table extraction, date extraction, cleaning and aggregation on
/// one document.
///
/// The date is read before the table is cleaned, so an undated report is
/// skipped without its values being inspected.
///
/// # Errors
///
/// Returns the first [`ReportError`] raised by any stage.
pub fn process_document(
    path: &Path,
    doc: &PdfDocument,
    config: &ReportConfig,
) -> Result<ExtractedDocument, ReportError> {
    let table = table_for(doc, config.table_page)?;
    let date_text = doc.page_text(config.date_page)?;
    let date = dates::parse_report_date(date_text, config.date_token_count)?;
    let rows = clean::clean(table, RegionTable::builtin(), config.include_total)?;
    let national = aggregate::aggregate(&rows, date)?;

    log::debug!(
        "{}: {} province rows dated {date}",
        path.display(),
        rows.len()
    );

    Ok(ExtractedDocument {
        path: path.to_path_buf(),
        date,
        rows,
        national,
    })
}

/// A document that did not contribute to a run, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDocument {
    /// The document's path.
    pub path: PathBuf,
    /// The error that caused the skip.
    pub reason: String,
}

/// Outcome counts for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Documents the run tried to process.
    pub attempted: usize,
    /// Documents that produced rows.
    pub contributed: usize,
    /// Documents skipped, in processing order.
    pub skipped: Vec<SkippedDocument>,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} documents attempted, {} contributed, {} skipped",
            self.attempted,
            self.contributed,
            self.skipped.len()
        )?;
        for skipped in &self.skipped {
            write!(f, "\n  {}: {}", skipped.path.display(), skipped.reason)?;
        }
        Ok(())
    }
}

/// A run that stopped on a non-recoverable error, with the counts reached
/// before it stopped.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct RunFailure {
    /// The error that stopped the run.
    pub error: ReportError,
    /// Documents attempted, contributed and skipped up to and including the
    /// failing one.
    pub summary: RunSummary,
}

impl From<ReportError> for RunFailure {
    /// A failure before any document was attempted.
    fn from(error: ReportError) -> Self {
        Self {
            error,
            summary: RunSummary::default(),
        }
    }
}

/// Lazily processes a list of documents.
///
/// Each document is loaded, processed and dropped within one call to
/// [`Iterator::next`]. Recoverable failures are logged, recorded in the
/// summary and skipped; any other failure is yielded as `Err`.
pub struct Documents<'a> {
    paths: std::vec::IntoIter<PathBuf>,
    loader: &'a dyn DocumentLoader,
    config: &'a ReportConfig,
    progress: Arc<dyn ProgressCallback>,
    summary: RunSummary,
}

impl<'a> Documents<'a> {
    /// Prepares a run over `paths`.
    #[must_use]
    pub fn new(
        paths: Vec<PathBuf>,
        loader: &'a dyn DocumentLoader,
        config: &'a ReportConfig,
        progress: Arc<dyn ProgressCallback>,
    ) -> Self {
        progress.set_total(paths.len() as u64);
        Self {
            paths: paths.into_iter(),
            loader,
            config,
            progress,
            summary: RunSummary::default(),
        }
    }

    /// Finishes progress reporting and returns the summary.
    #[must_use]
    pub fn into_summary(self) -> RunSummary {
        self.progress.finish(format!(
            "{} of {} documents contributed",
            self.summary.contributed, self.summary.attempted
        ));
        log::info!("{}", self.summary);
        self.summary
    }

    /// Adapts the run to yield one national record per document.
    #[must_use]
    pub const fn national_records(self) -> NationalRecords<'a> {
        NationalRecords { documents: self }
    }
}

impl Iterator for Documents<'_> {
    type Item = Result<ExtractedDocument, ReportError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let path = self.paths.next()?;
            self.summary.attempted += 1;
            self.progress.set_message(
                path.file_name()
                    .map_or_else(String::new, |n| n.to_string_lossy().into_owned()),
            );

            let outcome = self
                .loader
                .load(&path)
                .map_err(ReportError::from)
                .and_then(|doc| process_document(&path, &doc, self.config));
            self.progress.inc(1);

            match outcome {
                Ok(extracted) => {
                    self.summary.contributed += 1;
                    return Some(Ok(extracted));
                }
                Err(e) if e.is_recoverable() => {
                    log::warn!("Skipping {}: {e}", path.display());
                    self.summary.skipped.push(SkippedDocument {
                        path,
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    log::error!("Stopping at {}: {e}", path.display());
                    return Some(Err(e));
                }
            }
        }
    }
}

/// A [`Documents`] run yielding national records.
pub struct NationalRecords<'a> {
    documents: Documents<'a>,
}

impl NationalRecords<'_> {
    /// Finishes progress reporting and returns the summary.
    #[must_use]
    pub fn into_summary(self) -> RunSummary {
        self.documents.into_summary()
    }
}

impl Iterator for NationalRecords<'_> {
    type Item = Result<NationalRecord, ReportError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.documents
            .next()
            .map(|result| result.map(|doc| doc.national))
    }
}

/// Builds the national time series for every document in `dir` matching
/// `pattern`.
///
/// # Errors
///
/// Returns a [`RunFailure`] carrying [`ReportError::NoInput`] if nothing
/// matches, or the first non-recoverable error raised by a document
/// together with the counts reached so far.
pub fn run_national(
    dir: &Path,
    pattern: &str,
    loader: &dyn DocumentLoader,
    config: &ReportConfig,
    progress: Arc<dyn ProgressCallback>,
) -> Result<(TimeSeries, RunSummary), RunFailure> {
    let paths = discover_documents(dir, pattern)?;
    let mut records = Documents::new(paths, loader, config, progress).national_records();

    let mut collected = Vec::new();
    let mut failure = None;
    for record in records.by_ref() {
        match record {
            Ok(record) => collected.push(record),
            Err(error) => {
                failure = Some(error);
                break;
            }
        }
    }

    let summary = records.into_summary();
    if let Some(error) = failure {
        return Err(RunFailure { error, summary });
    }
    Ok((TimeSeries::from_records(collected), summary))
}

/// Collects dated province rows for every document in `dir` matching
/// `pattern`.
///
/// # Errors
///
/// Same as [`run_national`].
pub fn run_provinces(
    dir: &Path,
    pattern: &str,
    loader: &dyn DocumentLoader,
    config: &ReportConfig,
    progress: Arc<dyn ProgressCallback>,
) -> Result<(Vec<ProvinceRecord>, RunSummary), RunFailure> {
    let paths = discover_documents(dir, pattern)?;
    let mut documents = Documents::new(paths, loader, config, progress);

    let mut records = Vec::new();
    let mut failure = None;
    for doc in documents.by_ref() {
        match doc {
            Ok(doc) => records.extend(doc.province_records()),
            Err(error) => {
                failure = Some(error);
                break;
            }
        }
    }

    let summary = documents.into_summary();
    if let Some(error) = failure {
        return Err(RunFailure { error, summary });
    }
    records.sort_by(|a, b| a.date.cmp(&b.date).then(a.province.cmp(&b.province)));
    Ok((records, summary))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use nicd_pdf::PdfError;
    use nicd_report_models::{CanonicalColumn, Province};

    use super::*;
    use crate::progress::null_progress;

    const COLS: [usize; 3] = [0, 20, 40];

    fn row(values: [&str; 3]) -> String {
        let mut out = String::new();
        for (col, text) in COLS.iter().zip(values) {
            if text.is_empty() {
                continue;
            }
            while out.chars().count() < *col {
                out.push(' ');
            }
            out.push_str(text);
        }
        out
    }

    fn table_page(rows: &[(&str, &str, &str)]) -> String {
        let mut lines = vec![row(["Province", "Admissions to date", "Died to date"])];
        lines.extend(rows.iter().map(|(p, a, d)| row([p, a, d])));
        lines.join("\n")
    }

    fn report(date_page: &str, rows: &[(&str, &str, &str)]) -> PdfDocument {
        PdfDocument::from_pages(vec![date_page.to_string(), table_page(rows)])
    }

    struct MemoryLoader {
        docs: BTreeMap<PathBuf, PdfDocument>,
    }

    impl DocumentLoader for MemoryLoader {
        fn load(&self, path: &Path) -> Result<PdfDocument, PdfError> {
            self.docs.get(path).cloned().ok_or_else(|| {
                PdfError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    path.display().to_string(),
                ))
            })
        }
    }

    fn loader(docs: Vec<(&str, PdfDocument)>) -> MemoryLoader {
        MemoryLoader {
            docs: docs
                .into_iter()
                .map(|(p, d)| (PathBuf::from(p), d))
                .collect(),
        }
    }

    fn run(loader: &MemoryLoader) -> (Vec<NationalRecord>, RunSummary) {
        let config = ReportConfig::default();
        let paths: Vec<PathBuf> = loader.docs.keys().cloned().collect();
        let mut records = Documents::new(paths, loader, &config, null_progress()).national_records();
        let out: Vec<NationalRecord> = records.by_ref().map(Result::unwrap).collect();
        (out, records.into_summary())
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const JULY_14: &str = "14 July 2021 National Daily Report COVID-19 Hospital Surveillance NICD";

    /// A table page with right-aligned counts, as the reports print them.
    fn right_aligned_page(rows: &[(&str, &str, &str)]) -> String {
        let mut lines = vec![format!(
            "{:<20}{:<18}  {:<12}",
            "Province", "Admissions to date", "Died to date"
        )];
        lines.extend(
            rows.iter()
                .map(|(p, a, d)| format!("{p:<20}{a:>18}  {d:>12}")),
        );
        lines.join("\n")
    }

    #[test]
    fn nine_province_report_sums_provinces_without_total() {
        let page = right_aligned_page(&[
            ("Eastern Cape", "1,200", "300"),
            ("Free State", "310", "40"),
            ("Gauteng", "3,500", "700"),
            ("KwaZulu-Natal", "1,450", "350"),
            ("Limpopo", "220", "30"),
            ("Mpumalanga", "480", "60"),
            ("North West", "390", "50"),
            ("Northern Cape", "150", "20"),
            ("Western Cape", "671", "120"),
            ("Total", "8,371", "1,670"),
        ]);
        let docs = loader(vec![(
            "a.pdf",
            PdfDocument::from_pages(vec![JULY_14.to_string(), page]),
        )]);

        let (records, summary) = run(&docs);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, ymd(2021, 7, 14));
        assert_eq!(records[0].get(CanonicalColumn::AdmissionsToDate), Some(8371));
        assert_eq!(records[0].get(CanonicalColumn::DiedToDate), Some(1670));
        assert_eq!(summary.attempted, 1);
        assert_eq!(summary.contributed, 1);

        let config = ReportConfig::default();
        let mut documents = Documents::new(
            docs.docs.keys().cloned().collect(),
            &docs,
            &config,
            null_progress(),
        );
        let doc = documents.next().unwrap().unwrap();
        assert_eq!(doc.rows.len(), 9);
        assert!(doc.rows.iter().all(|r| !r.province.is_total()));
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("{name}_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn aborted_run_keeps_its_counts() {
        let dir = temp_dir("nicd_aborted_run");
        let blank_deaths = PdfDocument::from_pages(vec![
            JULY_14.replace("14 July", "15 July"),
            table_page(&[("Gauteng", "5400", "900"), ("Limpopo", "10", "")]),
        ]);
        let mut docs = Vec::new();
        for (name, doc) in [
            ("a.pdf", report(JULY_14, &[("Gauteng", "5400", "900")])),
            ("b.pdf", blank_deaths),
            ("c.pdf", report(JULY_14, &[("Gauteng", "5400", "n/a")])),
        ] {
            let path = dir.join(name);
            std::fs::write(&path, b"").unwrap();
            docs.push((path, doc));
        }
        let docs = MemoryLoader {
            docs: docs.into_iter().collect(),
        };

        let failure = run_national(
            &dir,
            "*.pdf",
            &docs,
            &ReportConfig::default(),
            null_progress(),
        )
        .unwrap_err();

        assert!(matches!(failure.error, ReportError::TypeCoercion { .. }));
        assert_eq!(failure.summary.attempted, 3);
        assert_eq!(failure.summary.contributed, 2);
        assert!(failure.summary.skipped.is_empty());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_input_fails_before_any_document() {
        let dir = temp_dir("nicd_no_input");
        let docs = loader(Vec::new());

        let failure = run_provinces(
            &dir,
            "*.pdf",
            &docs,
            &ReportConfig::default(),
            null_progress(),
        )
        .unwrap_err();
        assert!(matches!(failure.error, ReportError::NoInput { .. }));
        assert_eq!(failure.summary, RunSummary::default());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn identical_reports_produce_equal_ids() {
        let doc = report(JULY_14, &[("Gauteng", "5400", "900"), ("Limpopo", "10", "1")]);
        let docs = loader(vec![("a.pdf", doc.clone()), ("b.pdf", doc)]);

        let (records, _) = run(&docs);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, records[1].id);

        let series = TimeSeries::from_records(records);
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn undated_report_is_skipped_and_run_continues() {
        let docs = loader(vec![
            ("a.pdf", report("", &[("Gauteng", "5400", "900")])),
            ("b.pdf", report(JULY_14, &[("Gauteng", "5400", "900")])),
        ]);

        let (records, summary) = run(&docs);
        assert_eq!(records.len(), 1);
        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.contributed, 1);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].path, PathBuf::from("a.pdf"));
        assert!(summary.skipped[0].reason.contains("date page has no text"));
    }

    #[test]
    fn unreadable_and_tableless_documents_are_skipped() {
        let mut docs = loader(vec![
            ("b.pdf", PdfDocument::from_pages(vec![JULY_14.to_string()])),
            ("c.pdf", report(JULY_14, &[("Gauteng", "5400", "900")])),
        ]);
        let config = ReportConfig::default();
        let paths = vec![
            PathBuf::from("a.pdf"),
            PathBuf::from("b.pdf"),
            PathBuf::from("c.pdf"),
        ];
        docs.docs.remove(Path::new("a.pdf"));

        let mut documents = Documents::new(paths, &docs, &config, null_progress());
        let extracted: Vec<ExtractedDocument> = documents.by_ref().map(Result::unwrap).collect();
        let summary = documents.into_summary();

        assert_eq!(extracted.len(), 1);
        assert_eq!(extracted[0].rows[0].province, Province::Gauteng);
        assert_eq!(summary.skipped.len(), 2);
    }

    #[test]
    fn coercion_failure_stops_the_run() {
        let docs = loader(vec![
            ("a.pdf", report(JULY_14, &[("Gauteng", "n/a", "900")])),
            ("b.pdf", report(JULY_14, &[("Gauteng", "5400", "900")])),
        ]);
        let config = ReportConfig::default();
        let paths: Vec<PathBuf> = docs.docs.keys().cloned().collect();

        let mut documents = Documents::new(paths, &docs, &config, null_progress());
        assert!(matches!(
            documents.next(),
            Some(Err(ReportError::TypeCoercion { .. }))
        ));
    }

    #[test]
    fn province_records_are_dated() {
        let docs = loader(vec![(
            "a.pdf",
            report(JULY_14, &[("Gauteng", "5400", "900"), ("Limpopo", "10", "1")]),
        )]);
        let config = ReportConfig::default();
        let mut documents = Documents::new(
            docs.docs.keys().cloned().collect(),
            &docs,
            &config,
            null_progress(),
        );
        let doc = documents.next().unwrap().unwrap();
        let records = doc.province_records();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.date == ymd(2021, 7, 14)));
    }

    #[test]
    fn discovery_sorts_matches_and_rejects_empty_dirs() {
        let dir = std::env::temp_dir().join(format!("nicd_discover_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for name in ["b.pdf", "a.pdf", "notes.txt"] {
            std::fs::write(dir.join(name), b"").unwrap();
        }

        let paths = discover_documents(&dir, "*.pdf").unwrap();
        assert_eq!(paths, vec![dir.join("a.pdf"), dir.join("b.pdf")]);

        assert!(matches!(
            discover_documents(&dir, "*.csv"),
            Err(ReportError::NoInput { .. })
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn glob_characters_in_the_directory_match_literally() {
        let dir = temp_dir("nicd_reports_[2021]");
        std::fs::write(dir.join("a.pdf"), b"").unwrap();

        let paths = discover_documents(&dir, "*.pdf").unwrap();
        assert_eq!(paths, vec![dir.join("a.pdf")]);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
