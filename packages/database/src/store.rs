//! `DuckDB` storage of hospitalisation records.
//!
//! National and province-level records live in separate database files,
//! each with a single `hospitalisation` table. Only canonical numeric
//! columns are stored; extra columns from unusual report layouts are kept
//! in CSV output only.
//!
//! Inserts never duplicate: a national record is skipped when its `id` or
//! its `date` is already stored, a province record when its `id` or its
//! `(date, province)` pair is.

use std::path::Path;

use chrono::NaiveDate;
use duckdb::Connection;
use nicd_report_models::{CanonicalColumn, ColumnName, NationalRecord, ProvinceRecord};

use crate::DbError;

/// Which kind of record a database holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// One row per report date.
    National,
    /// One row per report date and province.
    Province,
}

fn value_columns() -> Vec<CanonicalColumn> {
    CanonicalColumn::numeric().collect()
}

/// Opens (or creates) a database file and ensures the schema exists.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open(path: &Path, granularity: Granularity) -> Result<Connection, DbError> {
    if let Some(parent) = path.parent() {
        crate::paths::ensure_dir(parent)?;
    }

    let conn = Connection::open(path)?;
    create_schema(&conn, granularity)?;

    log::debug!("Opened {granularity:?} store at {}", path.display());
    Ok(conn)
}

/// Opens an in-memory database with the schema in place.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open_in_memory(granularity: Granularity) -> Result<Connection, DbError> {
    let conn = Connection::open_in_memory()?;
    create_schema(&conn, granularity)?;
    Ok(conn)
}

/// Creates the `hospitalisation` table if it does not exist.
///
/// # Errors
///
/// Returns [`DbError`] if the statement fails.
pub fn create_schema(conn: &Connection, granularity: Granularity) -> Result<(), DbError> {
    let mut sql = String::from(
        "CREATE TABLE IF NOT EXISTS hospitalisation (
            id BIGINT NOT NULL PRIMARY KEY,
            date DATE NOT NULL",
    );
    if granularity == Granularity::Province {
        sql.push_str(",\n            province TEXT NOT NULL");
    }
    for column in value_columns() {
        sql.push_str(",\n            ");
        sql.push_str(column.as_ref());
        sql.push_str(" BIGINT");
    }
    sql.push_str("\n        );");

    conn.execute_batch(&sql)?;
    Ok(())
}

fn insert_sql(granularity: Granularity) -> String {
    let columns = value_columns();
    let names: Vec<&str> = columns.iter().map(AsRef::as_ref).collect();

    let (key_columns, key_values, duplicate) = match granularity {
        Granularity::National => (
            "id, date",
            "CAST(? AS BIGINT), CAST(? AS DATE)",
            "id = ? OR date = CAST(? AS DATE)",
        ),
        Granularity::Province => (
            "id, date, province",
            "CAST(? AS BIGINT), CAST(? AS DATE), CAST(? AS VARCHAR)",
            "id = ? OR (date = CAST(? AS DATE) AND province = ?)",
        ),
    };

    let placeholders = vec!["CAST(? AS BIGINT)"; names.len()].join(", ");
    format!(
        "INSERT INTO hospitalisation ({key_columns}, {columns})
         SELECT {key_values}, {placeholders}
         WHERE NOT EXISTS (SELECT 1 FROM hospitalisation WHERE {duplicate})",
        columns = names.join(", "),
    )
}

fn log_unstored(values: &std::collections::BTreeMap<ColumnName, i64>, date: NaiveDate) {
    for column in values.keys() {
        if let ColumnName::Other(name) = column {
            log::debug!("Column '{name}' for {date} is not stored in the database");
        }
    }
}

/// Inserts national records, skipping any already stored.
///
/// Returns the number of rows inserted.
///
/// # Errors
///
/// Returns [`DbError`] if any statement fails.
pub fn insert_national(conn: &Connection, records: &[NationalRecord]) -> Result<u64, DbError> {
    if records.is_empty() {
        return Ok(0);
    }

    let columns = value_columns();
    let mut stmt = conn.prepare(&insert_sql(Granularity::National))?;
    let mut inserted = 0u64;

    for record in records {
        log_unstored(&record.values, record.date);
        let date = record.date.format("%Y-%m-%d").to_string();

        stmt.raw_bind_parameter(1, record.id)?;
        stmt.raw_bind_parameter(2, &date)?;
        let mut idx = 3;
        for column in &columns {
            stmt.raw_bind_parameter(idx, record.get(*column))?;
            idx += 1;
        }
        stmt.raw_bind_parameter(idx, record.id)?;
        stmt.raw_bind_parameter(idx + 1, &date)?;

        let rows = stmt.raw_execute()?;
        if rows == 0 {
            log::debug!("Skipping stored record for {}", record.date);
        }
        inserted += u64::try_from(rows).unwrap_or(0);
    }

    log::info!(
        "Inserted {inserted} of {} national records",
        records.len()
    );
    Ok(inserted)
}

/// Inserts province records, skipping any already stored.
///
/// Returns the number of rows inserted.
///
/// # Errors
///
/// Returns [`DbError`] if any statement fails.
pub fn insert_provinces(conn: &Connection, records: &[ProvinceRecord]) -> Result<u64, DbError> {
    if records.is_empty() {
        return Ok(0);
    }

    let columns = value_columns();
    let mut stmt = conn.prepare(&insert_sql(Granularity::Province))?;
    let mut inserted = 0u64;

    for record in records {
        log_unstored(&record.values, record.date);
        let date = record.date.format("%Y-%m-%d").to_string();
        let province = record.province.as_ref();

        stmt.raw_bind_parameter(1, record.id)?;
        stmt.raw_bind_parameter(2, &date)?;
        stmt.raw_bind_parameter(3, province)?;
        let mut idx = 4;
        for column in &columns {
            stmt.raw_bind_parameter(idx, record.get(*column))?;
            idx += 1;
        }
        stmt.raw_bind_parameter(idx, record.id)?;
        stmt.raw_bind_parameter(idx + 1, &date)?;
        stmt.raw_bind_parameter(idx + 2, province)?;

        inserted += u64::try_from(stmt.raw_execute()?).unwrap_or(0);
    }

    log::info!(
        "Inserted {inserted} of {} province records",
        records.len()
    );
    Ok(inserted)
}

/// Returns the number of stored rows.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn record_count(conn: &Connection) -> Result<u64, DbError> {
    let mut stmt = conn.prepare("SELECT COUNT(*) FROM hospitalisation")?;
    let count: i64 = stmt.query_row([], |row| row.get(0))?;
    u64::try_from(count).map_err(|e| DbError::Conversion {
        message: e.to_string(),
    })
}

/// Returns the most recent stored report date, or `None` if the table is
/// empty.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or the date cannot be parsed.
pub fn latest_date(conn: &Connection) -> Result<Option<NaiveDate>, DbError> {
    let mut stmt = conn.prepare("SELECT CAST(MAX(date) AS VARCHAR) FROM hospitalisation")?;
    let latest: Option<String> = stmt.query_row([], |row| row.get(0))?;

    latest
        .map(|s| {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| DbError::Conversion {
                message: format!("invalid stored date '{s}': {e}"),
            })
        })
        .transpose()
}
