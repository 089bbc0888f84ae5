//! Load and insert configuration.
//!
//! A [`LoadConfig`] is an immutable value passed into every operation. It can
//! be built in code or read from a YAML file:
//!
//! ```yaml
//! column_char_type: nvarchar
//! insert_burst_size: 500
//! use_multi_rows_insert: true
//! max_decimal_number: 2
//! ```

use crate::error::{LoadError, Result};
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Default number of rows per executed insert statement
pub const DEFAULT_INSERT_BURST_SIZE: usize = 2000;

/// Default char width used when a table has no rows
pub const DEFAULT_NO_ROWS_CHAR_LENGTH: usize = 50;

/// Default chrono format for timestamp literals
pub const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Timestamp formats tried by type inference, in order
pub const DEFAULT_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// SQL type for text columns (dialect default when unset)
    pub column_char_type: Option<String>,
    /// SQL type for non-integer numeric columns
    pub column_numeric_type: Option<String>,
    /// SQL type for integer columns
    pub column_integer_type: Option<String>,
    /// SQL type for timestamp columns
    pub column_datetime_type: Option<String>,
    /// Text placed before every executed insert statement
    pub insert_start_command: Option<String>,
    /// Text placed after every executed insert statement
    pub insert_end_command: Option<String>,
    /// Fixed char length, 0 means auto-size from the data
    pub column_char_length: usize,
    /// Char length used when the table has no rows
    pub no_rows_char_length: usize,
    /// Rows per read page, 0 loads everything at once (advisory)
    pub load_burst_size: usize,
    /// Sort column used with `load_burst_size` (advisory)
    pub load_sort_column: Option<String>,
    /// Prefer the driver's native bulk fill when it has one (DuckDB)
    pub use_bulk_fill: bool,
    /// Rows per executed insert statement
    pub insert_burst_size: usize,
    /// Maximum fractional digits kept for numeric values
    pub max_decimal_number: Option<usize>,
    pub trim_text: bool,
    /// Replace CR and LF with spaces in text values
    pub remove_crlf: bool,
    /// Build one `INSERT ... VALUES (..),(..)` per batch
    pub use_multi_rows_insert: bool,
    /// Hints placed after the table name in insert statements
    pub insert_table_hints: String,
    /// Run type inference on delimited-text and spreadsheet loads
    pub detect_and_convert_types: bool,
    /// Record every executed statement in the debug log
    pub debug_mode: bool,
    /// Seconds, 0 means no timeout
    pub select_timeout: u64,
    /// Seconds, 0 means no timeout
    pub execute_timeout: u64,
    /// chrono format used for timestamp literals
    pub datetime_format: String,
    /// chrono formats tried when inferring timestamps
    pub date_formats: Vec<String>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            column_char_type: None,
            column_numeric_type: None,
            column_integer_type: None,
            column_datetime_type: None,
            insert_start_command: None,
            insert_end_command: None,
            column_char_length: 0,
            no_rows_char_length: DEFAULT_NO_ROWS_CHAR_LENGTH,
            load_burst_size: 0,
            load_sort_column: None,
            use_bulk_fill: false,
            insert_burst_size: DEFAULT_INSERT_BURST_SIZE,
            max_decimal_number: None,
            trim_text: true,
            remove_crlf: false,
            use_multi_rows_insert: false,
            insert_table_hints: String::new(),
            detect_and_convert_types: false,
            debug_mode: false,
            select_timeout: 0,
            execute_timeout: 0,
            datetime_format: DEFAULT_DATETIME_FORMAT.to_string(),
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl LoadConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: LoadConfig = serde_yaml_ng::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no operation can work with
    pub fn validate(&self) -> Result<()> {
        if self.insert_burst_size == 0 {
            return Err(LoadError::Config(
                "insert_burst_size must be at least 1".to_string(),
            ));
        }
        if self.datetime_format.trim().is_empty() {
            return Err(LoadError::Config(
                "datetime_format cannot be empty".to_string(),
            ));
        }
        for format in std::iter::once(&self.datetime_format).chain(&self.date_formats) {
            if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
                return Err(LoadError::Config(format!(
                    "Invalid date/time format: {}",
                    format
                )));
            }
        }
        Ok(())
    }

    /// Wrapper text placed before insert statements, treating blank as unset
    pub fn insert_start(&self) -> Option<&str> {
        non_blank(self.insert_start_command.as_deref())
    }

    /// Wrapper text placed after insert statements, treating blank as unset
    pub fn insert_end(&self) -> Option<&str> {
        non_blank(self.insert_end_command.as_deref())
    }

    pub fn select_timeout(&self) -> Option<Duration> {
        seconds(self.select_timeout)
    }

    pub fn execute_timeout(&self) -> Option<Duration> {
        seconds(self.execute_timeout)
    }
}

fn seconds(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Treat empty or whitespace-only overrides as "not set"
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoadConfig::default();
        assert_eq!(config.insert_burst_size, 2000);
        assert_eq!(config.no_rows_char_length, 50);
        assert_eq!(config.column_char_length, 0);
        assert!(config.trim_text);
        assert!(!config.remove_crlf);
        assert!(!config.use_multi_rows_insert);
        assert!(config.max_decimal_number.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_yaml_partial() {
        let config = LoadConfig::from_yaml(
            "column_char_type: nvarchar\ninsert_burst_size: 10\nuse_multi_rows_insert: true\nmax_decimal_number: 2\n",
        )
        .unwrap();
        assert_eq!(config.column_char_type.as_deref(), Some("nvarchar"));
        assert_eq!(config.insert_burst_size, 10);
        assert!(config.use_multi_rows_insert);
        assert_eq!(config.max_decimal_number, Some(2));
        // Untouched fields keep their defaults
        assert_eq!(config.no_rows_char_length, 50);
        assert!(config.trim_text);
    }

    #[test]
    fn test_zero_burst_size_rejected() {
        let err = LoadConfig::from_yaml("insert_burst_size: 0\n").unwrap_err();
        assert!(matches!(err, LoadError::Config(_)));
    }

    #[test]
    fn test_invalid_datetime_format_rejected() {
        let config = LoadConfig {
            datetime_format: "%Y-%Q".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_blank_wrappers_are_unset() {
        let config = LoadConfig {
            insert_start_command: Some("  ".to_string()),
            insert_end_command: Some("end;".to_string()),
            ..Default::default()
        };
        assert_eq!(config.insert_start(), None);
        assert_eq!(config.insert_end(), Some("end;"));
    }

    #[test]
    fn test_zero_timeout_means_none() {
        let config = LoadConfig {
            execute_timeout: 30,
            ..Default::default()
        };
        assert_eq!(config.select_timeout(), None);
        assert_eq!(config.execute_timeout(), Some(Duration::from_secs(30)));
    }
}
