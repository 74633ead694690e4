//! Row cleaning: from a normalized table to typed region rows.

use std::collections::BTreeMap;

use nicd_report_models::{CanonicalColumn, ColumnName, RegionRow};

use crate::ReportError;
use crate::regions::RegionTable;
use crate::table::Table;

const PROVINCE: ColumnName = ColumnName::Canonical(CanonicalColumn::Province);

/// Parses a count cell.
///
/// Accepts plain digits, or digit groups separated by `,` or by a single
/// space (`"1,234"`, `"1 234"`). Returns `None` for anything else,
/// including placeholders such as `"-"`.
#[must_use]
pub fn parse_count(cell: &str) -> Option<i64> {
    let cell = cell.trim();
    let groups: Vec<&str> = cell.split([',', ' ']).collect();
    if groups.iter().any(|g| g.is_empty() || !g.bytes().all(|b| b.is_ascii_digit())) {
        return None;
    }
    if groups.len() > 1 && groups[1..].iter().any(|g| g.len() != 3) {
        return None;
    }
    groups.concat().parse().ok()
}

/// Keeps the province rows of `table` and drops every column with a blank
/// cell in any kept row.
///
/// Rows are kept when their `province` cell is an exact spelling in
/// `regions`; `Total` rows only when `include_total` is set.
///
/// # Errors
///
/// * [`ReportError::MissingProvinceColumn`] if no column normalizes to
///   `province`
/// * [`ReportError::NoRegions`] if no row survives filtering
pub fn region_table(
    table: Table,
    regions: &RegionTable,
    include_total: bool,
) -> Result<Table, ReportError> {
    let Some(province_idx) = table.column_index(&PROVINCE) else {
        return Err(ReportError::MissingProvinceColumn {
            header: table.columns().iter().map(ToString::to_string).collect(),
        });
    };

    let table = table
        .filter_rows(|row| {
            row[province_idx]
                .text()
                .and_then(|t| regions.resolve(t))
                .is_some_and(|p| include_total || !p.is_total())
        })
        .mark_missing()
        .drop_incomplete_columns();

    if table.rows().is_empty() {
        return Err(ReportError::NoRegions);
    }

    Ok(table)
}

/// Cleans `table` with [`region_table`] and coerces the remaining values
/// to integers.
///
/// # Errors
///
/// Everything [`region_table`] returns, plus
/// [`ReportError::TypeCoercion`] if a kept value is not a count.
pub fn clean(
    table: Table,
    regions: &RegionTable,
    include_total: bool,
) -> Result<Vec<RegionRow>, ReportError> {
    let table = region_table(table, regions, include_total)?;
    let province_idx = table.column_index(&PROVINCE).ok_or(ReportError::NoRegions)?;

    let mut out = Vec::with_capacity(table.rows().len());
    for row in table.rows() {
        let province = row[province_idx]
            .text()
            .and_then(|t| regions.resolve(t))
            .ok_or(ReportError::NoRegions)?;
        let mut values = BTreeMap::new();
        for (idx, (name, cell)) in table.columns().iter().zip(row).enumerate() {
            if idx == province_idx {
                continue;
            }
            let text = cell.text().unwrap_or_default();
            let value = parse_count(text).ok_or_else(|| ReportError::TypeCoercion {
                column: name.to_string(),
                value: text.to_string(),
                province,
            })?;
            values.insert(name.clone(), value);
        }
        out.push(RegionRow { province, values });
    }

    log::debug!(
        "Cleaned {} region rows with {} value columns",
        out.len(),
        table.columns().len() - 1
    );

    Ok(out)
}
