//! Header normalization.
//!
//! Report authors retyped the table headers from month to month, so the
//! same column appears as `"Current in ICU "`, `"Current in ICU"` and
//! `"Currently in ICU"`. Headers are first snake-cased, then looked up in
//! an alias table mapping known variants to a [`CanonicalColumn`]. The
//! alias table lives in `data/columns.toml`; supporting a new spelling is
//! a data change only.

use std::collections::BTreeMap;
use std::str::FromStr as _;
use std::sync::LazyLock;

use nicd_report_models::{CanonicalColumn, ColumnName};
use serde::Deserialize;
use strum::IntoEnumIterator as _;

use crate::ReportError;

const COLUMNS_TOML: &str = include_str!("../data/columns.toml");

static BUILTIN: LazyLock<ColumnAliases> = LazyLock::new(|| {
    ColumnAliases::from_toml(COLUMNS_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse columns.toml: {e}"))
});

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AliasFile {
    aliases: BTreeMap<String, Vec<String>>,
}

/// Lookup from snake-cased header spellings to canonical columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnAliases {
    lookup: BTreeMap<String, CanonicalColumn>,
}

impl ColumnAliases {
    /// Returns the alias table embedded at compile time.
    ///
    /// # Panics
    ///
    /// Panics if the embedded `columns.toml` is malformed.
    #[must_use]
    pub fn builtin() -> &'static Self {
        &BUILTIN
    }

    /// Builds an alias table from TOML of the form
    /// `[aliases] canonical_name = ["variant", ...]`.
    ///
    /// Every canonical name always matches itself.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Config`] if the TOML is malformed, names an
    /// unknown canonical column, or maps one variant to two columns.
    pub fn from_toml(toml_str: &str) -> Result<Self, ReportError> {
        let file: AliasFile = toml::de::from_str(toml_str).map_err(|e| ReportError::Config {
            message: e.to_string(),
        })?;

        let mut lookup: BTreeMap<String, CanonicalColumn> = CanonicalColumn::iter()
            .map(|c| (c.as_ref().to_string(), c))
            .collect();

        for (name, variants) in file.aliases {
            let canonical =
                CanonicalColumn::from_str(&name).map_err(|_| ReportError::Config {
                    message: format!("unknown canonical column '{name}'"),
                })?;
            for variant in variants {
                let key = to_snake_case(&variant);
                match lookup.insert(key.clone(), canonical) {
                    Some(previous) if previous != canonical => {
                        return Err(ReportError::Config {
                            message: format!(
                                "header variant '{key}' maps to both '{previous}' and '{canonical}'"
                            ),
                        });
                    }
                    _ => {}
                }
            }
        }

        Ok(Self { lookup })
    }

    /// Normalizes a raw header to a column name.
    ///
    /// Known spellings resolve to their canonical column; anything else is
    /// returned snake-cased as [`ColumnName::Other`]. Never fails, and
    /// normalizing an already-normalized name returns it unchanged.
    #[must_use]
    pub fn normalize(&self, raw_header: &str) -> ColumnName {
        let folded = to_snake_case(raw_header);
        self.lookup
            .get(&folded)
            .map_or(ColumnName::Other(folded), |c| ColumnName::Canonical(*c))
    }
}

/// Folds a header to snake case: lowercase, every run of whitespace
/// (newlines included) replaced by one underscore.
///
/// Leading and trailing whitespace also become underscores, which is how
/// historical variants such as `current_in_icu_` arose.
#[must_use]
pub fn to_snake_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_whitespace = false;
    for c in raw.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push('_');
                in_whitespace = true;
            }
        } else {
            in_whitespace = false;
            out.extend(c.to_lowercase());
        }
    }
    out
}

/// Normalizes a raw header against the builtin alias table.
#[must_use]
pub fn normalize(raw_header: &str) -> ColumnName {
    ColumnAliases::builtin().normalize(raw_header)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use strum::IntoEnumIterator as _;

    use super::*;

    #[test]
    fn builtin_table_loads() {
        let aliases = ColumnAliases::builtin();
        for canonical in CanonicalColumn::iter() {
            assert_eq!(
                aliases.normalize(canonical.as_ref()),
                ColumnName::Canonical(canonical)
            );
        }
    }

    #[test]
    fn trailing_underscore_icu_variant_is_canonical() {
        assert_eq!(
            normalize("current_in_icu_"),
            ColumnName::Canonical(CanonicalColumn::CurrentlyInIcu)
        );
    }

    #[test]
    fn raw_report_headers_normalize() {
        assert_eq!(
            normalize("Current in ICU "),
            ColumnName::Canonical(CanonicalColumn::CurrentlyInIcu)
        );
        assert_eq!(
            normalize("Deaths to date"),
            ColumnName::Canonical(CanonicalColumn::DiedToDate)
        );
        assert_eq!(
            normalize("Admissions\nto date"),
            ColumnName::Canonical(CanonicalColumn::AdmissionsToDate)
        );
        assert_eq!(
            normalize("Province"),
            ColumnName::Canonical(CanonicalColumn::Province)
        );
        assert_eq!(
            normalize("Admissions i previous day"),
            ColumnName::Canonical(CanonicalColumn::AdmissionsInPreviousDay)
        );
    }

    #[test]
    fn every_listed_variant_maps_to_its_canonical_name() {
        let file: AliasFile = toml::de::from_str(COLUMNS_TOML).unwrap();
        for (name, variants) in file.aliases {
            let canonical = CanonicalColumn::from_str(&name).unwrap();
            for variant in variants {
                assert_eq!(
                    normalize(&variant),
                    ColumnName::Canonical(canonical),
                    "variant {variant:?}"
                );
            }
        }
    }

    #[test]
    fn unknown_headers_pass_through_snake_cased() {
        assert_eq!(
            normalize("Patients in General Ward"),
            ColumnName::Other("patients_in_general_ward".to_string())
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in [
            "Current in ICU ",
            "Patients in  General\nWard",
            "Died to date",
            "  leading",
            "",
        ] {
            let once = normalize(raw);
            let twice = normalize(once.as_str());
            assert_eq!(once, twice, "raw {raw:?}");
        }
    }

    #[test]
    fn snake_case_collapses_whitespace_runs() {
        assert_eq!(to_snake_case("Admissions \n to date"), "admissions_to_date");
        assert_eq!(to_snake_case("Current in ICU "), "current_in_icu_");
    }

    #[test]
    fn conflicting_variants_are_rejected() {
        let toml_str = r#"
            [aliases]
            died_to_date = ["deaths"]
            discharged_to_date = ["deaths"]
        "#;
        assert!(matches!(
            ColumnAliases::from_toml(toml_str),
            Err(ReportError::Config { .. })
        ));
    }

    #[test]
    fn unknown_canonical_names_are_rejected() {
        let toml_str = r#"
            [aliases]
            hospital_beds = ["beds"]
        "#;
        assert!(matches!(
            ColumnAliases::from_toml(toml_str),
            Err(ReportError::Config { .. })
        ));
    }

    #[test]
    fn custom_tables_extend_matching_without_code_changes() {
        let aliases = ColumnAliases::from_toml(
            r#"
            [aliases]
            currently_ventilated = ["on_ventilators"]
        "#,
        )
        .unwrap();
        assert_eq!(
            aliases.normalize("On Ventilators"),
            ColumnName::Canonical(CanonicalColumn::CurrentlyVentilated)
        );
    }
}
