//! Column mutation for delimiter-separated data files.
//!
//! The regression run perturbs one column of every input file by a fixed
//! offset so the re-ingested output is distinguishable from the archived
//! output. Cells are parsed as integers first so `5` becomes `1005` rather
//! than `1005.0`; only cells that fail the integer parse take the float
//! path. Anything that parses as neither is a hard error carrying the exact
//! row and column, not a silent skip.

#![allow(missing_docs)]

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::config::MutationConfig;
use crate::core::errors::{Result, VatError};

#[cfg(test)]
mod test_properties;

/// How a file is to be rewritten. `column` is a zero-based index into the
/// split row.
///
/// `skip_columns` only matters when it contains `column` itself: that run is
/// a no-op and callers bail out before touching any file. Skipping a column
/// that is never rewritten cannot change the output, so the row loop does
/// not consult the set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationSpec {
    pub column: usize,
    pub header_rows: usize,
    pub skip_columns: BTreeSet<usize>,
    pub delimiter: char,
    pub offset: i64,
}

impl MutationSpec {
    #[must_use]
    pub fn from_config(config: &MutationConfig, column: usize) -> Self {
        Self {
            column,
            header_rows: config.header_rows,
            skip_columns: BTreeSet::new(),
            delimiter: config.delimiter,
            offset: config.offset,
        }
    }

    /// True when the mutation column is itself in the skip set.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.skip_columns.contains(&self.column)
    }
}

/// What a single file rewrite did. Row counts include header rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationReport {
    pub path: PathBuf,
    pub rows_total: usize,
    pub rows_mutated: usize,
}

/// Rewrite `path` in place with the mutation column offset on every data
/// row. Header rows pass through unchanged; line endings are normalized to
/// `\n`. Errors name the failing row by its one-based line number.
pub fn mutate_file(path: &Path, spec: &MutationSpec) -> Result<MutationReport> {
    let text = fs::read_to_string(path).map_err(|e| VatError::io(path, e))?;
    let delimiter = spec.delimiter.to_string();

    let mut out = Vec::new();
    let mut rows_mutated = 0usize;
    for (index, line) in text.lines().enumerate() {
        if index < spec.header_rows {
            out.push(line.to_string());
            continue;
        }

        let mut cells: Vec<String> = line.split(spec.delimiter).map(str::to_string).collect();
        if spec.column >= cells.len() {
            return Err(VatError::ColumnOutOfRange {
                path: path.to_path_buf(),
                row: index + 1,
                column: spec.column,
                width: cells.len(),
            });
        }

        let raw = cells[spec.column].trim();
        let Some(shifted) = offset_cell(raw, spec.offset) else {
            return Err(VatError::NonNumericCell {
                path: path.to_path_buf(),
                row: index + 1,
                column: spec.column,
                value: raw.to_string(),
            });
        };
        cells[spec.column] = shifted;
        out.push(cells.join(&delimiter));
        rows_mutated += 1;
    }

    let rows_total = out.len();
    let mut body = out.join("\n");
    if !body.is_empty() {
        body.push('\n');
    }
    fs::write(path, body).map_err(|e| VatError::io(path, e))?;

    Ok(MutationReport {
        path: path.to_path_buf(),
        rows_total,
        rows_mutated,
    })
}

/// Integer parse first so integer cells stay integers; float fallback for
/// the rest. `None` means the cell is not numeric.
fn offset_cell(raw: &str, offset: i64) -> Option<String> {
    if let Ok(n) = raw.parse::<i64>()
        && let Some(sum) = n.checked_add(offset)
    {
        return Some(sum.to_string());
    }
    let value: f64 = raw.parse().ok()?;
    Some((value + offset as f64).to_string())
}
