//! Named-column table used while cleaning a report.
//!
//! Each operation consumes the table and returns a new one, so a cleaning
//! pass reads as a chain of steps.

use nicd_pdf::RawTable;
use nicd_report_models::{CanonicalColumn, ColumnName};

use crate::columns::ColumnAliases;

/// One table cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    /// Whitespace-folded cell text.
    Text(String),
    /// A blank cell.
    Missing,
}

impl Cell {
    /// Returns the cell text, or `None` for a missing cell.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Missing => None,
        }
    }

    /// Returns `true` for [`Cell::Missing`].
    #[must_use]
    pub const fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

/// A table with normalized column names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    columns: Vec<ColumnName>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Builds a table from pre-normalized columns and rows.
    ///
    /// Rows are truncated or padded with [`Cell::Missing`] to the column
    /// count.
    #[must_use]
    pub fn new(columns: Vec<ColumnName>, rows: Vec<Vec<Cell>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Cell::Missing);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Normalizes the header of an extracted table.
    ///
    /// A header that normalizes to an empty name drops its column, and when
    /// two headers normalize to the same name only the first is kept.
    /// Columns named `date` or `id` are dropped too: both are assigned to a
    /// record after aggregation and never read from the table.
    #[must_use]
    pub fn from_raw(raw: RawTable, aliases: &ColumnAliases) -> Self {
        let (header, raw_rows) = raw.into_parts();

        let mut columns: Vec<ColumnName> = Vec::with_capacity(header.len());
        let mut keep: Vec<usize> = Vec::with_capacity(header.len());
        for (idx, raw_name) in header.iter().enumerate() {
            let name = aliases.normalize(raw_name);
            if name.as_str().trim_matches('_').is_empty() {
                log::debug!("Dropping unnamed column {idx}");
                continue;
            }
            if matches!(
                name,
                ColumnName::Canonical(CanonicalColumn::Date | CanonicalColumn::Id)
            ) {
                log::warn!("Dropping '{raw_name}' column, {name} is assigned per record");
                continue;
            }
            if columns.contains(&name) {
                log::warn!("Duplicate column '{name}' (from '{raw_name}'), keeping the first");
                continue;
            }
            columns.push(name);
            keep.push(idx);
        }

        let rows = raw_rows
            .into_iter()
            .map(|row| {
                keep.iter()
                    .map(|&idx| row.get(idx).map_or(Cell::Missing, |s| Cell::Text(s.clone())))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    /// Normalized column names, in table order.
    #[must_use]
    pub fn columns(&self) -> &[ColumnName] {
        &self.columns
    }

    /// Data rows, each as wide as [`Table::columns`].
    #[must_use]
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Position of a column, if present.
    #[must_use]
    pub fn column_index(&self, name: &ColumnName) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Keeps the rows for which `keep` returns `true`.
    #[must_use]
    pub fn filter_rows(self, mut keep: impl FnMut(&[Cell]) -> bool) -> Self {
        Self {
            columns: self.columns,
            rows: self.rows.into_iter().filter(|row| keep(row)).collect(),
        }
    }

    /// Turns whitespace-only text cells into [`Cell::Missing`].
    #[must_use]
    pub fn mark_missing(self) -> Self {
        let rows = self
            .rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| match cell {
                        Cell::Text(s) if s.trim().is_empty() => Cell::Missing,
                        other => other,
                    })
                    .collect()
            })
            .collect();
        Self {
            columns: self.columns,
            rows,
        }
    }

    /// Drops every column that has at least one [`Cell::Missing`].
    #[must_use]
    pub fn drop_incomplete_columns(self) -> Self {
        let complete: Vec<bool> = (0..self.columns.len())
            .map(|idx| self.rows.iter().all(|row| !row[idx].is_missing()))
            .collect();

        for (name, _) in self.columns.iter().zip(&complete).filter(|(_, ok)| !**ok) {
            log::debug!("Dropping incomplete column '{name}'");
        }

        let columns = self
            .columns
            .into_iter()
            .zip(&complete)
            .filter_map(|(name, ok)| ok.then_some(name))
            .collect();
        let rows = self
            .rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .zip(&complete)
                    .filter_map(|(cell, ok)| ok.then_some(cell))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    /// Renders the table as plain strings (missing cells empty), with the
    /// normalized header first.
    #[must_use]
    pub fn to_records(&self) -> Vec<Vec<String>> {
        std::iter::once(self.columns.iter().map(ToString::to_string).collect())
            .chain(self.rows.iter().map(|row| {
                row.iter()
                    .map(|c| c.text().unwrap_or_default().to_string())
                    .collect()
            }))
            .collect()
    }
}
