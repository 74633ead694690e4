//! Report date extraction.
//!
//! The date appears in the title block at the top of the first page,
//! surrounded by report titles and organisation names that changed across
//! template revisions. Only the leading tokens are considered; known
//! boilerplate is removed and what remains is parsed with a list of
//! English date formats.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;

use crate::ReportError;

const BOILERPLATE_TOML: &str = include_str!("../data/boilerplate.toml");

/// Formats tried in order against each candidate span.
const DATE_FORMATS: &[&str] = &[
    "%d %B %Y", "%B %d %Y", "%d %b %Y", "%b %d %Y", "%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d",
    "%d-%m-%Y", "%d.%m.%Y",
];

static ORDINAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)\b").expect("valid regex"));

static BOILERPLATE: LazyLock<Boilerplate> = LazyLock::new(|| {
    Boilerplate::from_toml(BOILERPLATE_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse boilerplate.toml: {e}"))
});

/// Why a report date could not be determined.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateError {
    /// The date page has no text at all.
    #[error("date page has no text")]
    NoText,

    /// No date format matched the leading text.
    #[error("no date found in '{0}'")]
    Unparseable(String),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BoilerplateFile {
    strip: Vec<String>,
}

/// Case-insensitive patterns removed from the title block before parsing.
#[derive(Debug)]
pub struct Boilerplate {
    patterns: Vec<Regex>,
}

impl Boilerplate {
    /// Returns the boilerplate list embedded at compile time.
    ///
    /// # Panics
    ///
    /// Panics if the embedded `boilerplate.toml` is malformed.
    #[must_use]
    pub fn builtin() -> &'static Self {
        &BOILERPLATE
    }

    /// Builds a boilerplate list from TOML of the form `strip = [...]`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Config`] if the TOML is malformed.
    pub fn from_toml(toml_str: &str) -> Result<Self, ReportError> {
        let file: BoilerplateFile =
            toml::de::from_str(toml_str).map_err(|e| ReportError::Config {
                message: e.to_string(),
            })?;

        let mut strip = file.strip;
        strip.sort_by_key(|s| std::cmp::Reverse(s.len()));

        let patterns = strip
            .iter()
            .map(|s| {
                RegexBuilder::new(&boundary_pattern(s))
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| ReportError::Config {
                        message: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    /// Replaces every boilerplate occurrence with a space.
    #[must_use]
    pub fn strip(&self, text: &str) -> String {
        self.patterns
            .iter()
            .fold(text.to_string(), |acc, re| re.replace_all(&acc, " ").into_owned())
    }
}

/// Escapes a boilerplate entry, anchoring each end that is a word
/// character at a word boundary so entries never match inside longer
/// words.
fn boundary_pattern(entry: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let mut pattern = regex::escape(entry);
    if entry.chars().next().is_some_and(is_word) {
        pattern.insert_str(0, r"\b");
    }
    if entry.chars().last().is_some_and(is_word) {
        pattern.push_str(r"\b");
    }
    pattern
}

fn parse_span(span: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(span, fmt).ok())
}

/// Parses the report date from the leading `token_count` words of the
/// date page.
///
/// # Errors
///
/// Returns [`DateError::NoText`] for an empty page and
/// [`DateError::Unparseable`] when no date can be found.
pub fn parse_report_date(page_text: &str, token_count: usize) -> Result<NaiveDate, DateError> {
    let head = page_text
        .split_whitespace()
        .take(token_count)
        .collect::<Vec<_>>()
        .join(" ");
    if head.is_empty() {
        return Err(DateError::NoText);
    }

    let stripped = Boilerplate::builtin().strip(&head).replace(',', " ");
    let stripped = ORDINAL_RE.replace_all(&stripped, "$1");
    let tokens: Vec<&str> = stripped.split_whitespace().collect();

    let whole = tokens.join(" ");
    if let Some(date) = parse_span(&whole) {
        return Ok(date);
    }

    for window in [3, 1] {
        if let Some(date) = tokens
            .windows(window)
            .find_map(|w| parse_span(&w.join(" ")))
        {
            return Ok(date);
        }
    }

    Err(DateError::Unparseable(head))
}

/// Like [`parse_report_date`], logging the failure instead of returning it.
#[must_use]
pub fn extract_date(page_text: &str, token_count: usize) -> Option<NaiveDate> {
    match parse_report_date(page_text, token_count) {
        Ok(date) => Some(date),
        Err(e) => {
            log::warn!("Could not extract report date: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_leading_date_before_title() {
        assert_eq!(
            parse_report_date(
                "14 July 2021 National Daily Report COVID-19 Hospital Surveillance NICD",
                12
            ),
            Ok(ymd(2021, 7, 14))
        );
    }

    #[test]
    fn parses_date_after_title_with_ordinal_and_comma() {
        assert_eq!(
            parse_report_date(
                "COVID-19 Sentinel Hospital Surveillance Update\nWednesday, 2nd December 2020\nmore",
                12
            ),
            Ok(ymd(2020, 12, 2))
        );
    }

    #[test]
    fn parses_month_first_and_numeric_forms() {
        assert_eq!(
            parse_report_date("DATCOV report August 3, 2020", 12),
            Ok(ymd(2020, 8, 3))
        );
        assert_eq!(
            parse_report_date("Report generated 2021-01-05 by NICD", 12),
            Ok(ymd(2021, 1, 5))
        );
        assert_eq!(
            parse_report_date("Data as of 05/01/2021", 12),
            Ok(ymd(2021, 1, 5))
        );
    }

    #[test]
    fn only_leading_tokens_are_searched() {
        let text = "one two three four five 14 July 2021";
        assert!(matches!(
            parse_report_date(text, 4),
            Err(DateError::Unparseable(_))
        ));
        assert_eq!(parse_report_date(text, 8), Ok(ymd(2021, 7, 14)));
    }

    #[test]
    fn empty_page_has_no_text() {
        assert_eq!(parse_report_date("", 12), Err(DateError::NoText));
        assert_eq!(parse_report_date("  \n ", 12), Err(DateError::NoText));
        assert_eq!(extract_date("", 12), None);
    }

    #[test]
    fn boilerplate_only_matches_whole_words() {
        let stripped = Boilerplate::builtin().strip("NICDX report by NHLS-lab NICD");
        let tokens: Vec<&str> = stripped.split_whitespace().collect();
        assert_eq!(tokens, ["NICDX", "report", "by", "-lab"]);

        let boilerplate = Boilerplate::from_toml(r#"strip = ["Microsoft Word -"]"#).unwrap();
        assert_eq!(
            boilerplate.strip("Microsoft Word -14 July 2021").trim(),
            "14 July 2021"
        );
    }

    #[test]
    fn boilerplate_is_case_insensitive() {
        let stripped = Boilerplate::builtin().strip("nicd national daily report");
        assert_eq!(stripped.split_whitespace().count(), 0);
    }
}
