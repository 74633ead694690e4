//! National aggregation and the time series of national records.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use chrono::NaiveDate;
use nicd_report_models::{ColumnName, NationalRecord, Province, ProvinceRecord, RegionRow};
use sha2::{Digest as _, Sha256};

use crate::ReportError;

/// Content fingerprint of a record.
///
/// The rendering is `[province=...;]date=YYYY-MM-DD;col=value;...` with
/// columns in [`ColumnName`] order. The first eight bytes of its SHA-256
/// digest are read big-endian and shifted into the non-negative `i64`
/// range, so the same values always give the same id.
#[must_use]
pub fn fingerprint(
    date: NaiveDate,
    province: Option<Province>,
    values: &BTreeMap<ColumnName, i64>,
) -> i64 {
    let mut rendered = String::new();
    if let Some(province) = province {
        let _ = write!(rendered, "province={province};");
    }
    let _ = write!(rendered, "date={}", date.format("%Y-%m-%d"));
    for (column, value) in values {
        let _ = write!(rendered, ";{column}={value}");
    }

    let digest = Sha256::digest(rendered.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    i64::try_from(u64::from_be_bytes(head) >> 1).unwrap_or(i64::MAX)
}

/// Sums every column over `rows` into one national record.
///
/// A column contributes only when at least one row carries it; after
/// cleaning, all rows of a report share the same columns.
///
/// # Errors
///
/// Returns [`ReportError::CountOverflow`] if a column sum does not fit in
/// an `i64`.
pub fn aggregate(rows: &[RegionRow], date: NaiveDate) -> Result<NationalRecord, ReportError> {
    let mut values: BTreeMap<ColumnName, i64> = BTreeMap::new();
    for row in rows {
        for (column, value) in &row.values {
            let total = values.entry(column.clone()).or_default();
            *total = total
                .checked_add(*value)
                .ok_or_else(|| ReportError::CountOverflow {
                    column: column.to_string(),
                    date,
                })?;
        }
    }
    let id = fingerprint(date, None, &values);
    Ok(NationalRecord { date, id, values })
}

/// Stamps each region row with the report date and its own fingerprint.
#[must_use]
pub fn province_records(rows: &[RegionRow], date: NaiveDate) -> Vec<ProvinceRecord> {
    rows.iter()
        .map(|row| ProvinceRecord {
            date,
            id: fingerprint(date, Some(row.province), &row.values),
            province: row.province,
            values: row.values.clone(),
        })
        .collect()
}

/// National records ordered by date, one per date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeSeries {
    records: Vec<NationalRecord>,
}

impl TimeSeries {
    /// Sorts records by date and keeps the first record seen for each date.
    ///
    /// A later record for the same date with different values is dropped
    /// with a warning.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = NationalRecord>) -> Self {
        let mut records: Vec<NationalRecord> = records.into_iter().collect();
        records.sort_by_key(|r| r.date);

        let mut deduped: Vec<NationalRecord> = Vec::with_capacity(records.len());
        for record in records {
            match deduped.last() {
                Some(last) if last.date == record.date => {
                    if last.id != record.id {
                        log::warn!(
                            "Conflicting records for {}, keeping id {} and dropping id {}",
                            record.date,
                            last.id,
                            record.id
                        );
                    }
                }
                _ => deduped.push(record),
            }
        }

        Self { records: deduped }
    }

    /// The records, ascending by date.
    #[must_use]
    pub fn records(&self) -> &[NationalRecord] {
        &self.records
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if there are no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every value column present in any record, canonical columns first.
    #[must_use]
    pub fn columns(&self) -> Vec<ColumnName> {
        self.records
            .iter()
            .flat_map(|r| r.values.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Iterates over the records.
    pub fn iter(&self) -> std::slice::Iter<'_, NationalRecord> {
        self.records.iter()
    }
}

impl IntoIterator for TimeSeries {
    type Item = NationalRecord;
    type IntoIter = std::vec::IntoIter<NationalRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a TimeSeries {
    type Item = &'a NationalRecord;
    type IntoIter = std::slice::Iter<'a, NationalRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
