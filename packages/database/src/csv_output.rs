//! CSV output for national time series and scraped tables.
//!
//! Time series files have the value columns first (canonical columns in
//! vocabulary order, then any extra columns), followed by `date` and `id`.
//! A record without a value for some column leaves that cell empty.

use std::io::Write;
use std::path::{Path, PathBuf};

use nicd_report::aggregate::TimeSeries;
use nicd_report::table::Table;
use nicd_report_models::{ColumnName, NationalRecord};

use crate::DbError;
use crate::paths::ensure_dir;

fn write_records<'a, W: Write>(
    writer: W,
    columns: &[ColumnName],
    records: impl IntoIterator<Item = &'a NationalRecord>,
) -> Result<(), DbError> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header: Vec<&str> = columns.iter().map(ColumnName::as_str).collect();
    header.extend(["date", "id"]);
    csv_writer.write_record(&header)?;

    for record in records {
        let mut row: Vec<String> = columns
            .iter()
            .map(|c| record.values.get(c).map_or_else(String::new, ToString::to_string))
            .collect();
        row.push(record.date.format("%Y-%m-%d").to_string());
        row.push(record.id.to_string());
        csv_writer.write_record(&row)?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Writes a whole time series to `writer`.
///
/// # Errors
///
/// Returns [`DbError`] if writing fails.
pub fn write_time_series<W: Write>(writer: W, series: &TimeSeries) -> Result<(), DbError> {
    write_records(writer, &series.columns(), series)
}

/// Writes a whole time series to the file at `path`, creating parent
/// directories as needed.
///
/// # Errors
///
/// Returns [`DbError`] if the file cannot be created or written.
pub fn write_time_series_file(path: &Path, series: &TimeSeries) -> Result<(), DbError> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_time_series(file, series)?;
    log::info!("Wrote {} records to {}", series.len(), path.display());
    Ok(())
}

/// Writes one `{date}_nicd.csv` file per record into `dir`.
///
/// Returns the paths written, in date order.
///
/// # Errors
///
/// Returns [`DbError`] if any file cannot be created or written.
pub fn write_per_report(dir: &Path, series: &TimeSeries) -> Result<Vec<PathBuf>, DbError> {
    ensure_dir(dir)?;

    let mut written = Vec::with_capacity(series.len());
    for record in series {
        let path = dir.join(format!("{}_nicd.csv", record.date.format("%Y-%m-%d")));
        let columns: Vec<ColumnName> = record.values.keys().cloned().collect();
        let file = std::fs::File::create(&path)?;
        write_records(file, &columns, [record])?;
        log::debug!("Wrote {}", path.display());
        written.push(path);
    }

    log::info!("Wrote {} per-report files to {}", written.len(), dir.display());
    Ok(written)
}

/// Writes a normalized report table (header first) to `writer`.
///
/// # Errors
///
/// Returns [`DbError`] if writing fails.
pub fn write_table<W: Write>(writer: W, table: &Table) -> Result<(), DbError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in table.to_records() {
        csv_writer.write_record(&record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Writes a normalized report table to the file at `path`.
///
/// # Errors
///
/// Returns [`DbError`] if the file cannot be created or written.
pub fn write_table_file(path: &Path, table: &Table) -> Result<(), DbError> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_table(file, table)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;
    use nicd_report::aggregate::aggregate;
    use nicd_report::table::Cell;
    use nicd_report_models::{CanonicalColumn, Province, RegionRow};

    use super::*;

    fn record(day: u32, values: &[(ColumnName, i64)]) -> NationalRecord {
        let row = RegionRow {
            province: Province::Gauteng,
            values: values.iter().cloned().collect::<BTreeMap<_, _>>(),
        };
        aggregate(&[row], NaiveDate::from_ymd_opt(2021, 7, day).unwrap()).unwrap()
    }

    fn series() -> TimeSeries {
        TimeSeries::from_records([
            record(
                15,
                &[
                    (CanonicalColumn::DiedToDate.into(), 9),
                    (ColumnName::Other("general_ward".to_string()), 3),
                ],
            ),
            record(
                14,
                &[
                    (CanonicalColumn::AdmissionsToDate.into(), 100),
                    (CanonicalColumn::DiedToDate.into(), 8),
                ],
            ),
        ])
    }

    #[test]
    fn time_series_header_puts_date_and_id_last() {
        let series = series();
        let mut out = Vec::new();
        write_time_series(&mut out, &series).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "admissions_to_date,died_to_date,general_ward,date,id"
        );
        let first_id = series.records()[0].id;
        assert_eq!(lines[1], format!("100,8,,2021-07-14,{first_id}"));
        assert!(lines[2].starts_with(",9,3,2021-07-15,"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn per_report_files_are_named_by_date() {
        let dir = std::env::temp_dir().join(format!("nicd_csv_{}", std::process::id()));
        let written = write_per_report(&dir, &series()).unwrap();

        assert_eq!(
            written,
            vec![dir.join("2021-07-14_nicd.csv"), dir.join("2021-07-15_nicd.csv")]
        );
        let second = std::fs::read_to_string(&written[1]).unwrap();
        assert!(second.starts_with("died_to_date,general_ward,date,id\n9,3,2021-07-15,"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn tables_write_normalized_header() {
        let table = Table::new(
            vec![
                CanonicalColumn::Province.into(),
                CanonicalColumn::CurrentlyInIcu.into(),
            ],
            vec![vec![Cell::Text("Gauteng".to_string()), Cell::Missing]],
        );
        let mut out = Vec::new();
        write_table(&mut out, &table).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "province,currently_in_icu\nGauteng,\n"
        );
    }
}
