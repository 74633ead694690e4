//! Grid detection over laid-out page text.
//!
//! `pdf-extract` renders each text line of a page with the horizontal gaps
//! between table cells preserved as runs of spaces. A cell is therefore any
//! run of words separated by single spaces, and a table is a block of
//! consecutive lines whose cells line up under a common set of column
//! starts.
//!
//! Detection works in two passes:
//! 1. Split the page into dense regions (consecutive lines with at least two
//!    cells), align every line of a region against the region's dominant
//!    column layout, and keep the largest aligned block.
//! 2. Climb the lines directly above the block and absorb wrapped header
//!    fragments that fit the column layout.
//!
//! Leading rows without any numeric cell form the header; wrapped header
//! lines are joined column by column into one logical cell.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

/// A run of words separated by single spaces.
static CELL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+(?: \S+)*").expect("valid regex"));

/// How far (in characters) a cell may start left of its column.
const ALIGN_TOLERANCE: usize = 1;

/// Maximum number of wrapped header lines absorbed above a block.
const MAX_HEADER_LINES: usize = 3;

/// A table as extracted from a page: a header row and the data rows below
/// it, every cell whitespace-folded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    rejected_rows: usize,
}

impl RawTable {
    /// Builds a table from a header and data rows.
    ///
    /// Rows whose cell count differs from the header's are rejected: they
    /// are dropped with a warning and counted in
    /// [`RawTable::rejected_rows`].
    #[must_use]
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = header.len();
        let total = rows.len();
        let rows: Vec<Vec<String>> = rows
            .into_iter()
            .filter(|row| {
                if row.len() == width {
                    true
                } else {
                    log::warn!(
                        "Rejecting malformed row with {} cells (header has {width}): {row:?}",
                        row.len()
                    );
                    false
                }
            })
            .collect();
        let rejected_rows = total - rows.len();

        Self {
            header,
            rows,
            rejected_rows,
        }
    }

    /// The header cells.
    #[must_use]
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// The data rows (header excluded).
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of malformed rows dropped at construction.
    #[must_use]
    pub const fn rejected_rows(&self) -> usize {
        self.rejected_rows
    }

    /// Consumes the table, returning `(header, rows)`.
    #[must_use]
    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<String>>) {
        (self.header, self.rows)
    }
}

/// Collapses every run of whitespace (including newlines) into a single
/// space and trims the ends.
#[must_use]
pub fn fold_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A cell as found on a line, with character offsets.
#[derive(Debug, Clone)]
struct Fragment {
    start: usize,
    end: usize,
    text: String,
}

fn fragments(line: &str) -> Vec<Fragment> {
    let line = line.replace('\u{a0}', " ");
    CELL_RE
        .find_iter(&line)
        .map(|m| {
            let start = line[..m.start()].chars().count();
            Fragment {
                start,
                end: start + m.as_str().chars().count(),
                text: m.as_str().to_string(),
            }
        })
        .collect()
}

/// Places each fragment of a line in a column, or returns `None` if the
/// line does not fit the layout.
fn align(frags: &[Fragment], starts: &[usize]) -> Option<Vec<String>> {
    let mut cells = vec![String::new(); starts.len()];
    let mut last_col: Option<usize> = None;

    for frag in frags {
        let col = starts
            .iter()
            .rposition(|&s| s <= frag.start + ALIGN_TOLERANCE)?;
        if last_col.is_some_and(|last| col <= last) {
            return None;
        }
        if let Some(&next) = starts.get(col + 1)
            && frag.end > next + ALIGN_TOLERANCE
        {
            return None;
        }
        cells[col] = fold_whitespace(&frag.text);
        last_col = Some(col);
    }

    Some(cells)
}

/// Most frequent line width in a region (ties go to the wider layout).
fn dominant_width(lines: &[&Vec<Fragment>]) -> usize {
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for line in lines {
        *counts.entry(line.len()).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by_key(|&(width, count)| (count, width))
        .map_or(0, |(width, _)| width)
}

/// Column starts of a layout: the leftmost start of each column across
/// every full-width line.
fn column_starts(lines: &[&Vec<Fragment>], width: usize) -> Vec<usize> {
    let mut starts = vec![usize::MAX; width];
    for line in lines.iter().filter(|l| l.len() == width) {
        for (col, frag) in line.iter().enumerate() {
            starts[col] = starts[col].min(frag.start);
        }
    }
    starts
}

/// A candidate table: indices into the non-blank line list plus the
/// aligned rows.
struct Candidate {
    first_line: usize,
    starts: Vec<usize>,
    rows: Vec<Vec<String>>,
}

impl Candidate {
    fn area(&self) -> usize {
        self.rows.len() * self.starts.len()
    }
}

/// Scans one dense region for aligned blocks.
fn region_candidates(lines: &[Vec<Fragment>], region: std::ops::Range<usize>) -> Vec<Candidate> {
    let region_lines: Vec<&Vec<Fragment>> = lines[region.clone()].iter().collect();
    let width = dominant_width(&region_lines);
    if width < 2 {
        return Vec::new();
    }
    let starts = column_starts(&region_lines, width);

    let mut candidates = Vec::new();
    let mut current: Option<(usize, Vec<Vec<String>>, bool)> = None;

    for idx in region {
        let frags = &lines[idx];
        match align(frags, &starts) {
            Some(cells) => {
                let full = frags.len() == width;
                match current.as_mut() {
                    Some((_, rows, has_full)) => {
                        rows.push(cells);
                        *has_full |= full;
                    }
                    None => current = Some((idx, vec![cells], full)),
                }
            }
            None => {
                if let Some((first_line, rows, true)) = current.take()
                    && rows.len() >= 2
                {
                    candidates.push(Candidate {
                        first_line,
                        starts: starts.clone(),
                        rows,
                    });
                }
            }
        }
    }

    if let Some((first_line, rows, true)) = current
        && rows.len() >= 2
    {
        candidates.push(Candidate {
            first_line,
            starts,
            rows,
        });
    }

    candidates
}

fn looks_numeric(cell: &str) -> bool {
    let digits: String = cell.chars().filter(|c| *c != ',' && *c != ' ').collect();
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

fn is_data_row(row: &[String]) -> bool {
    row.iter().skip(1).any(|cell| looks_numeric(cell))
}

/// Detects the largest table on a page and returns it as a [`RawTable`].
///
/// Returns `None` if the page contains no block of at least two aligned
/// lines with two or more columns.
#[must_use]
pub fn extract_table(page_text: &str) -> Option<RawTable> {
    let lines: Vec<Vec<Fragment>> = page_text
        .lines()
        .map(fragments)
        .filter(|f| !f.is_empty())
        .collect();

    let mut best: Option<Candidate> = None;
    let mut region_start: Option<usize> = None;

    for idx in 0..=lines.len() {
        let dense = lines.get(idx).is_some_and(|l| l.len() >= 2);
        match (dense, region_start) {
            (true, None) => region_start = Some(idx),
            (false, Some(start)) => {
                for candidate in region_candidates(&lines, start..idx) {
                    if best.as_ref().is_none_or(|b| candidate.area() > b.area()) {
                        best = Some(candidate);
                    }
                }
                region_start = None;
            }
            _ => {}
        }
    }

    let best = best?;

    // Absorb wrapped header lines sitting directly above the block.
    let mut above: Vec<Vec<String>> = Vec::new();
    for frags in lines[..best.first_line]
        .iter()
        .rev()
        .take(MAX_HEADER_LINES)
    {
        let caption = frags.len() == 1 && frags[0].start + ALIGN_TOLERANCE < best.starts[1];
        if caption {
            break;
        }
        match align(frags, &best.starts) {
            Some(cells) if !is_data_row(&cells) => above.push(cells),
            _ => break,
        }
    }
    above.reverse();

    let mut rows = above;
    rows.extend(best.rows);

    let mut header_count = rows.iter().take_while(|row| !is_data_row(row)).count();
    if header_count == 0 || header_count == rows.len() {
        header_count = 1;
    }

    let width = best.starts.len();
    let body = rows.split_off(header_count);
    let header: Vec<String> = (0..width)
        .map(|col| {
            let parts: Vec<&str> = rows
                .iter()
                .map(|row| row[col].as_str())
                .filter(|s| !s.is_empty())
                .collect();
            fold_whitespace(&parts.join(" "))
        })
        .collect();

    log::debug!(
        "Detected {} x {width} table (header spans {header_count} lines)",
        body.len()
    );

    Some(RawTable::new(header, body))
}
