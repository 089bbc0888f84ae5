//! Error types for the bulk-load engine.

use crate::dialect::Dialect;
use thiserror::Error;

/// Main error type for load, insert and query operations.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The database rejected a generated statement
    #[error("Error executing SQL:\n{sql}\n\n{message}")]
    Execute { sql: String, message: String },

    /// Preparing or reading a query failed
    #[error("Error got when executing '{sql}':\n{message}")]
    Load { sql: String, message: String },

    /// A connection could not be opened
    #[error("Connection error: {0}")]
    Connection(String),

    /// No driver is registered for the requested dialect
    #[error("No driver registered for dialect {0}")]
    NoDriver(Dialect),

    /// A row does not line up with the table's columns
    #[error("Row {row} has {found} values but table '{table}' has {expected} columns")]
    RowWidth {
        table: String,
        row: usize,
        expected: usize,
        found: usize,
    },

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// SQLite driver error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// DuckDB driver error
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// Delimited text parsing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// YAML configuration error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LoadError {
    /// Wrap a statement failure with the SQL that caused it
    pub fn execute(sql: impl Into<String>, message: impl std::fmt::Display) -> Self {
        LoadError::Execute {
            sql: sql.into(),
            message: message.to_string(),
        }
    }

    /// Wrap a query failure with the SQL that caused it
    pub fn load(sql: impl Into<String>, message: impl std::fmt::Display) -> Self {
        LoadError::Load {
            sql: sql.into(),
            message: message.to_string(),
        }
    }

    /// SQL text attached to the error, if any
    pub fn sql(&self) -> Option<&str> {
        match self {
            LoadError::Execute { sql, .. } | LoadError::Load { sql, .. } => Some(sql),
            _ => None,
        }
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, LoadError>;
