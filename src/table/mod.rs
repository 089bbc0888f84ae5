//! In-memory tabular dataset: ordered columns plus ordered rows.
//!
//! A [`DataTable`] is what every source produces and what the SQL generator
//! and the bulk insert engine consume. Column names are kept unique and every
//! row is kept exactly as wide as the column list.

use crate::error::{LoadError, Result};
use chrono::NaiveDateTime;
use std::fmt;

/// Format used when a timestamp is rendered as plain text
pub const TIMESTAMP_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Primitive type tag of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnKind {
    Integer,
    Float,
    Timestamp,
    #[default]
    Text,
}

impl ColumnKind {
    /// Integer and floating-point columns are rendered as numbers
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Float)
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Integer => write!(f, "integer"),
            ColumnKind::Float => write!(f, "float"),
            ColumnKind::Timestamp => write!(f, "timestamp"),
            ColumnKind::Text => write!(f, "text"),
        }
    }
}

/// A single cell value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Float(f64),
    Timestamp(NaiveDateTime),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Kind this value naturally belongs to (None for null)
    pub fn kind(&self) -> Option<ColumnKind> {
        match self {
            Value::Null => None,
            Value::Integer(_) => Some(ColumnKind::Integer),
            Value::Float(_) => Some(ColumnKind::Float),
            Value::Timestamp(_) => Some(ColumnKind::Timestamp),
            Value::Text(_) => Some(ColumnKind::Text),
        }
    }

    /// Borrow the text payload of a `Text` value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Default textual rendering. Null renders as the empty string.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_DISPLAY_FORMAT)),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(ts: NaiveDateTime) -> Self {
        Value::Timestamp(ts)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Column descriptor. All columns are nullable.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    /// Declared maximum text length, if the source knows one
    pub max_length: Option<usize>,
    /// Type name reported by the driver, when loaded from a database
    pub declared_type: Option<String>,
    /// Computed result columns with no origin table column.
    ///
    /// Schema flags are filled by drivers that expose origin metadata
    /// (SQLite); DuckDB reports none and leaves them `false`.
    pub read_only: bool,
    pub auto_increment: bool,
    /// Sole primary key column or sole column of a unique index
    pub unique: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ..Default::default()
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::Text)
    }

    pub fn with_max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }
}

/// An ordered sequence of values aligned with the table's columns
pub type Row = Vec<Value>;

/// Ordered columns plus ordered rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTable {
    name: String,
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl DataTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Build a table from a column list, de-duplicating names on the way in
    pub fn with_columns(name: impl Into<String>, columns: Vec<Column>) -> Self {
        let mut table = Self::new(name);
        for column in columns {
            table.add_column(column);
        }
        table
    }

    /// Build an all-text table from raw string rows.
    ///
    /// `None` cells become null, everything else becomes text.
    pub fn from_text_rows<S: AsRef<str>>(
        name: impl Into<String>,
        headers: &[S],
        rows: Vec<Vec<Option<String>>>,
    ) -> Result<Self> {
        let columns = headers.iter().map(|h| Column::text(h.as_ref())).collect();
        let mut table = Self::with_columns(name, columns);
        for row in rows {
            table.push_row(row.into_iter().map(Value::from).collect())?;
        }
        Ok(table)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, top to bottom
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().filter_map(move |row| row.get(index))
    }

    /// Append a column and return its final (unique) name.
    ///
    /// A name that collides with an existing column gets `_<column count>`
    /// appended until it is unique. Existing rows are padded with nulls.
    pub fn add_column(&mut self, mut column: Column) -> &str {
        while self.columns.iter().any(|c| c.name == column.name) {
            column.name = format!("{}_{}", column.name, self.columns.len());
        }
        for row in &mut self.rows {
            row.push(Value::Null);
        }
        self.columns.push(column);
        // Safe: we just pushed a column
        &self.columns[self.columns.len() - 1].name
    }

    /// Append a row. The row must have exactly one value per column.
    pub fn push_row(&mut self, row: Row) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(LoadError::RowWidth {
                table: self.name.clone(),
                row: self.rows.len(),
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Replace a single cell. Out-of-range positions are ignored.
    pub fn set_value(&mut self, row: usize, column: usize, value: Value) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(column)) {
            *cell = value;
        }
    }

    /// True when no column is typed beyond text
    pub fn is_all_text(&self) -> bool {
        self.columns.iter().all(|c| c.kind == ColumnKind::Text)
    }
}
