#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Canonical types shared across the NICD hospitalisation pipeline.
//!
//! Every report revision spells its headers and provinces slightly
//! differently. Extraction code normalizes those spellings into the closed
//! vocabularies defined here ([`CanonicalColumn`] and [`Province`]) so that
//! downstream aggregation and persistence only ever deal with one schema.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator as _;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// The closed vocabulary of column names a report header can normalize to.
///
/// Declaration order is the stable output order used for CSV headers and
/// database schemas.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CanonicalColumn {
    /// Region name.
    Province,
    /// Number of sentinel facilities that submitted data.
    FacilitiesReporting,
    /// Cumulative admissions.
    AdmissionsToDate,
    /// Cumulative in-hospital deaths.
    DiedToDate,
    /// Cumulative discharges.
    DischargedToDate,
    /// Patients in hospital on the report date.
    CurrentlyAdmitted,
    /// Patients in ICU on the report date.
    CurrentlyInIcu,
    /// Patients ventilated on the report date.
    CurrentlyVentilated,
    /// Patients receiving oxygen on the report date.
    CurrentlyOxygenated,
    /// Admissions reported in the previous day.
    AdmissionsInPreviousDay,
    /// Report date.
    Date,
    /// Content fingerprint.
    Id,
}

impl CanonicalColumn {
    /// Returns `true` for the columns that carry integer counts.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        !matches!(self, Self::Province | Self::Date | Self::Id)
    }

    /// All numeric columns, in output order.
    pub fn numeric() -> impl Iterator<Item = Self> {
        Self::iter().filter(|c| c.is_numeric())
    }
}

/// A normalized column name: either a member of the canonical vocabulary
/// or an unrecognized header carried through as extra data.
///
/// Ordering places every canonical column first (in vocabulary order) and
/// unknown columns after, sorted lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ColumnName {
    /// A recognized column.
    Canonical(CanonicalColumn),
    /// An unrecognized column, already snake-cased.
    Other(String),
}

impl ColumnName {
    /// Returns the column's snake-case name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Canonical(c) => c.as_ref(),
            Self::Other(s) => s,
        }
    }

    /// Returns `true` if this is the `province` column.
    #[must_use]
    pub const fn is_province(&self) -> bool {
        matches!(self, Self::Canonical(CanonicalColumn::Province))
    }
}

impl From<CanonicalColumn> for ColumnName {
    fn from(value: CanonicalColumn) -> Self {
        Self::Canonical(value)
    }
}

impl fmt::Display for ColumnName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fixed set of regions a report table can contain.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
pub enum Province {
    #[strum(serialize = "Eastern Cape")]
    #[serde(rename = "Eastern Cape")]
    EasternCape,
    #[strum(serialize = "Free State")]
    #[serde(rename = "Free State")]
    FreeState,
    #[strum(serialize = "Gauteng")]
    Gauteng,
    #[strum(serialize = "KwaZulu-Natal")]
    #[serde(rename = "KwaZulu-Natal")]
    KwaZuluNatal,
    #[strum(serialize = "Limpopo")]
    Limpopo,
    #[strum(serialize = "Mpumalanga")]
    Mpumalanga,
    #[strum(serialize = "North West")]
    #[serde(rename = "North West")]
    NorthWest,
    #[strum(serialize = "Northern Cape")]
    #[serde(rename = "Northern Cape")]
    NorthernCape,
    #[strum(serialize = "Western Cape")]
    #[serde(rename = "Western Cape")]
    WesternCape,
    /// Precomputed national total printed by some report revisions.
    #[strum(serialize = "Total")]
    Total,
}

impl Province {
    /// Returns `true` for the precomputed `Total` row.
    #[must_use]
    pub const fn is_total(self) -> bool {
        matches!(self, Self::Total)
    }
}

/// One province's line of statistics from a single report, after cleaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionRow {
    /// Which region the row describes.
    pub province: Province,
    /// Integer values keyed by column (never contains `province`).
    pub values: BTreeMap<ColumnName, i64>,
}

/// The national aggregate for a single report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NationalRecord {
    /// Report date.
    pub date: NaiveDate,
    /// Content fingerprint of the rendered values, used for deduplication.
    pub id: i64,
    /// Column sums across all region rows.
    pub values: BTreeMap<ColumnName, i64>,
}

impl NationalRecord {
    /// Returns the value for a canonical column, if present.
    #[must_use]
    pub fn get(&self, column: CanonicalColumn) -> Option<i64> {
        self.values.get(&ColumnName::Canonical(column)).copied()
    }
}

/// A region row stamped with its report date and fingerprint, for
/// province-level persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvinceRecord {
    /// Report date.
    pub date: NaiveDate,
    /// Content fingerprint (includes the province).
    pub id: i64,
    /// Region the values belong to.
    pub province: Province,
    /// Integer values keyed by column.
    pub values: BTreeMap<ColumnName, i64>,
}

impl ProvinceRecord {
    /// Returns the value for a canonical column, if present.
    #[must_use]
    pub fn get(&self, column: CanonicalColumn) -> Option<i64> {
        self.values.get(&ColumnName::Canonical(column)).copied()
    }
}
