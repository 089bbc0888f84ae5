//! Positional equality of two materialized tables.
//!
//! Values are compared by their default text rendering, so `1` (integer) and
//! `"1"` (text) are equal while row order matters.

use crate::table::{DataTable, Value};

/// True when row counts, column counts and every rendered value match
pub fn are_tables_identical(left: &DataTable, right: &DataTable) -> bool {
    left.row_count() == right.row_count()
        && left.column_count() == right.column_count()
        && left
            .rows()
            .iter()
            .zip(right.rows())
            .all(|(a, b)| are_rows_identical(a, b))
}

/// True when both rows hold the same rendered values in the same order
pub fn are_rows_identical(left: &[Value], right: &[Value]) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .zip(right)
            .all(|(a, b)| a.to_string() == b.to_string())
}

/// Position of the first difference, as `(row, column)`.
///
/// A row count or column count mismatch is reported at the first index past
/// the shorter side. `None` means the tables are identical.
pub fn first_difference(left: &DataTable, right: &DataTable) -> Option<(usize, usize)> {
    if left.column_count() != right.column_count() {
        return Some((0, left.column_count().min(right.column_count())));
    }
    for (r, (a, b)) in left.rows().iter().zip(right.rows()).enumerate() {
        if let Some(c) = a
            .iter()
            .zip(b)
            .position(|(x, y)| x.to_string() != y.to_string())
        {
            return Some((r, c));
        }
    }
    if left.row_count() != right.row_count() {
        return Some((left.row_count().min(right.row_count()), 0));
    }
    None
}
