//! Province enumeration used to filter table rows.
//!
//! Matching is exact against the spellings in `data/provinces.toml`. A
//! spelling seen in a report but missing from the file (such as the
//! `" North West"` variant with a leading space) is fixed by adding it to
//! the file, never by fuzzy matching.

use std::collections::BTreeMap;
use std::str::FromStr as _;
use std::sync::LazyLock;

use nicd_report_models::Province;
use serde::Deserialize;

use crate::ReportError;

const PROVINCES_TOML: &str = include_str!("../data/provinces.toml");

static BUILTIN: LazyLock<RegionTable> = LazyLock::new(|| {
    RegionTable::from_toml(PROVINCES_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse provinces.toml: {e}"))
});

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProvinceFile {
    provinces: BTreeMap<String, Vec<String>>,
}

/// Lookup from the exact cell text of a report row to its province.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionTable {
    lookup: BTreeMap<String, Province>,
}

impl RegionTable {
    /// Returns the province table embedded at compile time.
    ///
    /// # Panics
    ///
    /// Panics if the embedded `provinces.toml` is malformed.
    #[must_use]
    pub fn builtin() -> &'static Self {
        &BUILTIN
    }

    /// Builds a table from TOML of the form
    /// `[provinces] "Canonical Name" = ["spelling", ...]`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Config`] if the TOML is malformed, a key is
    /// not a known province, or one spelling is listed for two provinces.
    pub fn from_toml(toml_str: &str) -> Result<Self, ReportError> {
        let file: ProvinceFile = toml::de::from_str(toml_str).map_err(|e| ReportError::Config {
            message: e.to_string(),
        })?;

        let mut lookup = BTreeMap::new();
        for (name, spellings) in file.provinces {
            let province = Province::from_str(&name).map_err(|_| ReportError::Config {
                message: format!("unknown province '{name}'"),
            })?;
            for spelling in spellings {
                if let Some(previous) = lookup.insert(spelling.clone(), province)
                    && previous != province
                {
                    return Err(ReportError::Config {
                        message: format!(
                            "spelling '{spelling}' listed for both {previous} and {province}"
                        ),
                    });
                }
            }
        }

        Ok(Self { lookup })
    }

    /// Resolves a province cell, or `None` for rows that are not regions
    /// (subtotals, repeated headers, footnotes).
    #[must_use]
    pub fn resolve(&self, cell: &str) -> Option<Province> {
        self.lookup.get(cell).copied()
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator as _;

    use super::*;

    #[test]
    fn every_province_resolves_by_its_display_name() {
        let table = RegionTable::builtin();
        for province in Province::iter() {
            assert_eq!(table.resolve(province.as_ref()), Some(province));
        }
    }

    #[test]
    fn leading_space_north_west_is_listed() {
        assert_eq!(
            RegionTable::builtin().resolve(" North West"),
            Some(Province::NorthWest)
        );
    }

    #[test]
    fn non_region_rows_do_not_resolve() {
        let table = RegionTable::builtin();
        assert_eq!(table.resolve("Province"), None);
        assert_eq!(table.resolve("*Data as of 14 July"), None);
        assert_eq!(table.resolve("gauteng"), None);
    }

    #[test]
    fn rejects_unknown_province_keys() {
        let toml_str = r#"
            [provinces]
            "Atlantis" = ["Atlantis"]
        "#;
        assert!(matches!(
            RegionTable::from_toml(toml_str),
            Err(ReportError::Config { .. })
        ));
    }
}
