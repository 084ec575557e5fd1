//! Property-based tests for the column mutator.
//!
//! Uses `proptest` to verify that arbitrary integer grids keep their shape
//! under mutation: the target column moves by exactly the offset, every
//! other cell is byte-identical, and the row count never changes.

use std::collections::BTreeSet;
use std::fs;

use proptest::prelude::*;
use tempfile::tempdir;

use super::{MutationSpec, mutate_file};

fn render(grid: &[Vec<i64>]) -> String {
    let mut body = String::new();
    for row in grid {
        let cells: Vec<String> = row.iter().map(i64::to_string).collect();
        body.push_str(&cells.join(","));
        body.push('\n');
    }
    body
}

/// Fixed-width integer grids with a valid target column.
fn arb_case() -> impl Strategy<Value = (usize, Vec<Vec<i64>>)> {
    (2usize..6).prop_flat_map(|width| {
        (
            0..width,
            prop::collection::vec(
                prop::collection::vec(-10_000i64..10_000, width..=width),
                1..16,
            ),
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The target column moves by exactly the offset on every row.
    #[test]
    fn target_column_moves_by_the_offset(
        (column, grid) in arb_case(),
        offset in -5_000i64..5_000,
    ) {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("grid.csv");
        fs::write(&path, render(&grid)).expect("write");

        let spec = MutationSpec {
            column,
            header_rows: 0,
            skip_columns: BTreeSet::new(),
            delimiter: ',',
            offset,
        };
        let report = mutate_file(&path, &spec).expect("mutate");
        prop_assert_eq!(report.rows_total, grid.len());
        prop_assert_eq!(report.rows_mutated, grid.len());

        let text = fs::read_to_string(&path).expect("read");
        for (line, row) in text.lines().zip(&grid) {
            let cells: Vec<&str> = line.split(',').collect();
            prop_assert_eq!(cells.len(), row.len());
            let moved: i64 = cells[column].parse().expect("integer cell");
            prop_assert_eq!(moved, row[column] + offset);
        }
    }

    /// Cells outside the target column survive byte-identical, and the
    /// line count is preserved.
    #[test]
    fn other_cells_are_untouched((column, grid) in arb_case()) {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("grid.csv");
        fs::write(&path, render(&grid)).expect("write");

        let spec = MutationSpec {
            column,
            header_rows: 0,
            skip_columns: BTreeSet::new(),
            delimiter: ',',
            offset: 1000,
        };
        mutate_file(&path, &spec).expect("mutate");

        let text = fs::read_to_string(&path).expect("read");
        prop_assert_eq!(text.lines().count(), grid.len());
        for (line, row) in text.lines().zip(&grid) {
            let cells: Vec<&str> = line.split(',').collect();
            for (index, cell) in cells.iter().enumerate() {
                if index == column {
                    continue;
                }
                prop_assert_eq!(*cell, row[index].to_string());
            }
        }
    }

    /// Header rows never change, whatever the grid underneath them does.
    #[test]
    fn header_rows_are_inert((column, grid) in arb_case()) {
        let header = "site,instrument,value,flag,aux\n";
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("grid.csv");
        fs::write(&path, format!("{header}{}", render(&grid))).expect("write");

        let spec = MutationSpec {
            column,
            header_rows: 1,
            skip_columns: BTreeSet::new(),
            delimiter: ',',
            offset: 1000,
        };
        mutate_file(&path, &spec).expect("mutate");

        let text = fs::read_to_string(&path).expect("read");
        prop_assert_eq!(text.lines().next().expect("header line"), header.trim_end());
    }
}
