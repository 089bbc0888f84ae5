//! Override surface for generated SQL.
//!
//! Every method returns `None` by default, which leaves the built-in
//! algorithm in charge. Returning `Some` replaces it entirely for that call.

use crate::table::{Column, DataTable, Value};

pub trait SqlHooks {
    /// Full `CREATE TABLE` statement
    fn table_create(&self, _table: &DataTable) -> Option<String> {
        None
    }

    /// Comma-separated column list used in inserts
    fn column_names(&self, _table: &DataTable) -> Option<String> {
        None
    }

    /// A single quoted column name
    fn column_name(&self, _column: &Column) -> Option<String> {
        None
    }

    /// SQL type of one column
    fn column_type(&self, _table: &DataTable, _column_index: usize) -> Option<String> {
        None
    }

    /// Comma-separated rendered values of one row
    fn row_values(
        &self,
        _table: &DataTable,
        _row: &[Value],
        _datetime_format: &str,
    ) -> Option<String> {
        None
    }

    /// One rendered literal
    fn value(&self, _column: &Column, _value: &Value, _datetime_format: &str) -> Option<String> {
        None
    }
}

/// No overrides at all
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl SqlHooks for NoHooks {}
