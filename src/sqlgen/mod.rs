//! Dialect-aware SQL text generation.
//!
//! Builds identifiers, `CREATE TABLE` statements, column lists, column types
//! and row value lists for one [`Dialect`]. Generation never fails on a bad
//! value: numbers that do not parse render as `NULL`, anything else falls
//! back to quoted text.
//!
//! # Example
//!
//! ```ignore
//! use sql_bulkload::{config::LoadConfig, dialect::Dialect, sqlgen::SqlGenerator};
//!
//! let config = LoadConfig::default();
//! let gen = SqlGenerator::new(Dialect::SqlServer, &config);
//! assert_eq!(gen.database_name("My \"Col\"/1"), "[My _Col__1]");
//! ```

mod hooks;

pub use hooks::{NoHooks, SqlHooks};

use crate::config::LoadConfig;
use crate::dialect::{Dialect, DialectRules};
use crate::infer::parse_float;
use crate::table::{Column, ColumnKind, DataTable, Value, TIMESTAMP_DISPLAY_FORMAT};
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write;

/// Characters that are replaced with `_` in identifiers
static RE_ILLEGAL_IDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[-"'\[\]`()/%\r\t\n]"#).unwrap());

static NO_HOOKS: NoHooks = NoHooks;

/// Replace characters that are illegal or dangerous in identifiers with `_`
pub fn sanitize_identifier(name: &str) -> String {
    RE_ILLEGAL_IDENT.replace_all(name, "_").into_owned()
}

/// Wrap text in single quotes, doubling embedded quotes
pub fn quote_single(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

pub struct SqlGenerator<'a> {
    rules: DialectRules,
    config: &'a LoadConfig,
    hooks: &'a dyn SqlHooks,
}

impl<'a> SqlGenerator<'a> {
    pub fn new(dialect: Dialect, config: &'a LoadConfig) -> Self {
        Self {
            rules: dialect.rules(),
            config,
            hooks: &NO_HOOKS,
        }
    }

    /// Route generation through caller-supplied overrides
    pub fn with_hooks(mut self, hooks: &'a dyn SqlHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.rules.dialect
    }

    pub fn rules(&self) -> &DialectRules {
        &self.rules
    }

    pub fn config(&self) -> &LoadConfig {
        self.config
    }

    /// Sanitized, dialect-quoted identifier
    pub fn database_name(&self, name: &str) -> String {
        self.rules.quote_style.apply(&sanitize_identifier(name))
    }

    /// Wrap an insert batch with the configured start/end commands
    pub fn insert_command(&self, sql: &str) -> String {
        self.rules.wrap_insert(self.config, sql)
    }

    pub fn table_create_sql(&self, table: &DataTable) -> String {
        if let Some(sql) = self.hooks.table_create(table) {
            return sql;
        }
        let columns: Vec<String> = table
            .columns()
            .iter()
            .enumerate()
            .map(|(i, col)| {
                format!(
                    "{} {} NULL",
                    self.column_name_sql(col),
                    self.column_type_sql(table, i)
                )
            })
            .collect();
        format!(
            "CREATE TABLE {} ({})",
            self.database_name(table.name()),
            columns.join(",")
        )
    }

    pub fn column_names_sql(&self, table: &DataTable) -> String {
        if let Some(sql) = self.hooks.column_names(table) {
            return sql;
        }
        table
            .columns()
            .iter()
            .map(|col| self.column_name_sql(col))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn column_name_sql(&self, column: &Column) -> String {
        if let Some(sql) = self.hooks.column_name(column) {
            return sql;
        }
        self.database_name(&column.name)
    }

    /// SQL type of one column.
    ///
    /// Numeric columns get the integer type when every stored value reads as a
    /// 32-bit integer, the numeric type otherwise. Text columns are sized from
    /// the configured length or from the longest rendered value.
    pub fn column_type_sql(&self, table: &DataTable, index: usize) -> String {
        if let Some(sql) = self.hooks.column_type(table, index) {
            return sql;
        }
        let Some(column) = table.column(index) else {
            return self.rules.char_type(self.config).to_string();
        };
        match column.kind {
            ColumnKind::Integer | ColumnKind::Float => {
                let all_integer = table
                    .column_values(index)
                    .all(|v| v.is_null() || v.to_string().trim().parse::<i32>().is_ok());
                if all_integer {
                    self.rules.integer_type(self.config).to_string()
                } else {
                    self.rules.numeric_type(self.config).to_string()
                }
            }
            ColumnKind::Timestamp => self.rules.datetime_type(self.config).to_string(),
            ColumnKind::Text => self.char_column_type(table, index, column),
        }
    }

    fn char_column_type(&self, table: &DataTable, index: usize, column: &Column) -> String {
        let char_type = self.rules.char_type(self.config);
        let fixed = self.config.column_char_length;
        let len = if fixed > 0 {
            column.max_length.filter(|&l| l > 0).unwrap_or(fixed)
        } else if table.is_empty() {
            self.config.no_rows_char_length
        } else {
            auto_char_length(table, index)
        };

        match self.rules.wide_char_limit {
            Some(limit) if fixed == 0 && len > limit => format!("{}(max)", char_type),
            _ => format!("{}({})", char_type, len),
        }
    }

    pub fn row_values_sql(&self, table: &DataTable, row: &[Value]) -> String {
        let datetime_format = self.config.datetime_format.as_str();
        if let Some(sql) = self.hooks.row_values(table, row, datetime_format) {
            return sql;
        }
        let mut out = String::new();
        for (i, (column, value)) in table.columns().iter().zip(row).enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&self.value_sql(column, value));
        }
        out
    }

    /// Render one value as a SQL literal for the given column
    pub fn value_sql(&self, column: &Column, value: &Value) -> String {
        let datetime_format = self.config.datetime_format.as_str();
        if let Some(sql) = self.hooks.value(column, value, datetime_format) {
            return sql;
        }
        if value.is_null() {
            return "NULL".to_string();
        }
        match column.kind {
            ColumnKind::Integer | ColumnKind::Float => self.numeric_literal(value),
            ColumnKind::Timestamp => match value {
                Value::Timestamp(ts) => quote_single(&format_timestamp(ts, datetime_format)),
                other => self.text_literal(&other.to_string()),
            },
            ColumnKind::Text => self.text_literal(&value.to_string()),
        }
    }

    fn numeric_literal(&self, value: &Value) -> String {
        let text = match value {
            Value::Integer(n) => return n.to_string(),
            Value::Float(x) => x.to_string(),
            Value::Text(s) => match parse_float(s) {
                Some(_) => s.trim().replace(',', "."),
                None => return "NULL".to_string(),
            },
            Value::Timestamp(_) | Value::Null => return "NULL".to_string(),
        };
        match self.config.max_decimal_number {
            Some(max) => truncate_decimals(&text, max),
            None => text,
        }
    }

    fn text_literal(&self, text: &str) -> String {
        let mut text = if self.config.trim_text {
            text.trim()
        } else {
            text
        }
        .to_string();
        if self.config.remove_crlf {
            text = text.replace(['\r', '\n'], " ");
        }
        quote_single(&text)
    }
}

/// Longest rendered value plus one
fn auto_char_length(table: &DataTable, index: usize) -> usize {
    let longest = table
        .column_values(index)
        .map(|v| v.to_string().chars().count())
        .max()
        .unwrap_or(0);
    longest + 1
}

/// Keep at most `max` fractional digits of an `int.frac` literal.
///
/// Anything that is not exactly one `.` split followed by plain digits
/// (an exponent, for instance) is returned unchanged.
pub fn truncate_decimals(text: &str, max: usize) -> String {
    let mut parts = text.split('.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(int), Some(frac), None)
            if frac.len() > max && frac.bytes().all(|b| b.is_ascii_digit()) =>
        {
            if max == 0 {
                int.to_string()
            } else {
                format!("{}.{}", int, &frac[..max])
            }
        }
        _ => text.to_string(),
    }
}

/// Format a timestamp, falling back to the display format on a bad pattern
fn format_timestamp(ts: &NaiveDateTime, format: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", ts.format(format)).is_err() {
        out.clear();
        let _ = write!(out, "{}", ts.format(TIMESTAMP_DISPLAY_FORMAT));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn numeric_table(values: Vec<Value>) -> DataTable {
        let mut table = DataTable::with_columns("t", vec![Column::new("n", ColumnKind::Float)]);
        for v in values {
            table.push_row(vec![v]).unwrap();
        }
        table
    }

    #[test]
    fn test_sanitize_identifier() {
        assert_eq!(sanitize_identifier("My \"Col\"/1"), "My _Col__1");
        assert_eq!(sanitize_identifier("a-b'c[d]e`f(g)h%i"), "a_b_c_d_e_f_g_h_i");
        assert_eq!(sanitize_identifier("x\ry\tz\n"), "x_y_z_");
    }

    #[test]
    fn test_database_name_per_dialect() {
        let config = LoadConfig::default();
        let name = "My \"Col\"/1";
        assert_eq!(
            SqlGenerator::new(Dialect::SqlServer, &config).database_name(name),
            "[My _Col__1]"
        );
        assert_eq!(
            SqlGenerator::new(Dialect::Postgres, &config).database_name(name),
            "\"My _Col__1\""
        );
        assert_eq!(
            SqlGenerator::new(Dialect::MySql, &config).database_name(name),
            "`My _Col__1`"
        );
        assert_eq!(
            SqlGenerator::new(Dialect::Odbc, &config).database_name(name),
            "My__Col__1"
        );
    }

    #[test]
    fn test_numeric_column_type_integer_vs_numeric() {
        let config = LoadConfig::default();
        let gen = SqlGenerator::new(Dialect::SqlServer, &config);
        let ints = numeric_table(vec![Value::Float(1.0), Value::Null, Value::Float(7.0)]);
        assert_eq!(gen.column_type_sql(&ints, 0), "int");
        let mixed = numeric_table(vec![Value::Float(1.0), Value::Float(2.5)]);
        assert_eq!(gen.column_type_sql(&mixed, 0), "numeric(18,5)");
        let big = numeric_table(vec![Value::Integer(5_000_000_000)]);
        assert_eq!(gen.column_type_sql(&big, 0), "numeric(18,5)");
    }

    #[test]
    fn test_char_auto_size() {
        let config = LoadConfig::default();
        let gen = SqlGenerator::new(Dialect::Postgres, &config);
        let table = DataTable::from_text_rows(
            "t",
            &["c"],
            vec![vec![Some("ab".to_string())], vec![Some("abcd".to_string())]],
        )
        .unwrap();
        assert_eq!(gen.column_type_sql(&table, 0), "varchar(5)");

        let empty = DataTable::with_columns("t", vec![Column::text("c")]);
        assert_eq!(gen.column_type_sql(&empty, 0), "varchar(50)");
    }

    #[test]
    fn test_char_fixed_length_and_declared_length() {
        let config = LoadConfig {
            column_char_length: 20,
            ..Default::default()
        };
        let gen = SqlGenerator::new(Dialect::Postgres, &config);
        let table = DataTable::with_columns(
            "t",
            vec![Column::text("a"), Column::text("b").with_max_length(7)],
        );
        assert_eq!(gen.column_type_sql(&table, 0), "varchar(20)");
        assert_eq!(gen.column_type_sql(&table, 1), "varchar(7)");
    }

    #[test]
    fn test_sqlserver_wide_char_is_max() {
        let config = LoadConfig::default();
        let gen = SqlGenerator::new(Dialect::SqlServer, &config);
        let table = DataTable::from_text_rows("t", &["c"], vec![vec![Some("x".repeat(8000))]])
            .unwrap();
        assert_eq!(gen.column_type_sql(&table, 0), "varchar(max)");

        let pg = SqlGenerator::new(Dialect::Postgres, &config);
        assert_eq!(pg.column_type_sql(&table, 0), "varchar(8001)");
    }

    #[test]
    fn test_value_rendering() {
        let config = LoadConfig::default();
        let gen = SqlGenerator::new(Dialect::Postgres, &config);
        let int_col = Column::new("i", ColumnKind::Integer);
        let float_col = Column::new("f", ColumnKind::Float);
        let ts_col = Column::new("d", ColumnKind::Timestamp);
        let text_col = Column::text("s");

        assert_eq!(gen.value_sql(&int_col, &Value::Integer(42)), "42");
        assert_eq!(gen.value_sql(&float_col, &Value::Float(3.14)), "3.14");
        assert_eq!(gen.value_sql(&float_col, &Value::from("2,5")), "2.5");
        assert_eq!(gen.value_sql(&float_col, &Value::from("oops")), "NULL");
        for col in [&int_col, &float_col, &ts_col, &text_col] {
            assert_eq!(gen.value_sql(col, &Value::Null), "NULL");
        }
        let ts = NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(7, 8, 9)
            .unwrap();
        assert_eq!(
            gen.value_sql(&ts_col, &Value::Timestamp(ts)),
            "'2024-05-06 07:08:09'"
        );
        assert_eq!(gen.value_sql(&text_col, &Value::from("  it's  ")), "'it''s'");
    }

    #[test]
    fn test_text_options() {
        let config = LoadConfig {
            trim_text: false,
            remove_crlf: true,
            ..Default::default()
        };
        let gen = SqlGenerator::new(Dialect::Postgres, &config);
        assert_eq!(
            gen.value_sql(&Column::text("s"), &Value::from(" a\r\nb ")),
            "' a  b '"
        );
    }

    #[test]
    fn test_max_decimal_number() {
        let config = LoadConfig {
            max_decimal_number: Some(2),
            ..Default::default()
        };
        let gen = SqlGenerator::new(Dialect::Postgres, &config);
        let float_col = Column::new("f", ColumnKind::Float);
        let int_col = Column::new("i", ColumnKind::Integer);
        assert_eq!(gen.value_sql(&float_col, &Value::Float(3.14159)), "3.14");
        assert_eq!(gen.value_sql(&float_col, &Value::Float(3.1)), "3.1");
        assert_eq!(gen.value_sql(&int_col, &Value::Integer(123456)), "123456");
        assert_eq!(truncate_decimals("1.2.3", 1), "1.2.3");
        assert_eq!(truncate_decimals("9.99", 0), "9");
    }

    #[test]
    fn test_max_decimal_number_keeps_exponent_text() {
        let config = LoadConfig {
            max_decimal_number: Some(2),
            ..Default::default()
        };
        let gen = SqlGenerator::new(Dialect::Postgres, &config);
        let float_col = Column::new("f", ColumnKind::Float);
        assert_eq!(gen.value_sql(&float_col, &Value::from("1.5e10")), "1.5e10");
        assert_eq!(gen.value_sql(&float_col, &Value::from("2,71828")), "2.71");
        assert_eq!(truncate_decimals("1.2345E-3", 2), "1.2345E-3");
    }

    #[test]
    fn test_table_create_sql() {
        let config = LoadConfig::default();
        let gen = SqlGenerator::new(Dialect::SqlServer, &config);
        let mut table = DataTable::with_columns(
            "My Table",
            vec![
                Column::new("id", ColumnKind::Integer),
                Column::text("name"),
                Column::new("at", ColumnKind::Timestamp),
            ],
        );
        table
            .push_row(vec![Value::Integer(1), Value::from("abc"), Value::Null])
            .unwrap();
        assert_eq!(
            gen.table_create_sql(&table),
            "CREATE TABLE [My Table] ([id] int NULL,[name] varchar(4) NULL,[at] datetime2 NULL)"
        );
        assert_eq!(gen.column_names_sql(&table), "[id],[name],[at]");
        assert_eq!(gen.row_values_sql(&table, &table.rows()[0]), "1,'abc',NULL");
    }

    struct UpperHooks;

    impl SqlHooks for UpperHooks {
        fn column_name(&self, column: &Column) -> Option<String> {
            Some(column.name.to_uppercase())
        }

        fn value(&self, _column: &Column, value: &Value, _fmt: &str) -> Option<String> {
            match value {
                Value::Null => Some("DEFAULT".to_string()),
                _ => None,
            }
        }
    }

    #[test]
    fn test_hooks_replace_builtin() {
        let config = LoadConfig::default();
        let hooks = UpperHooks;
        let gen = SqlGenerator::new(Dialect::Postgres, &config).with_hooks(&hooks);
        let mut table = DataTable::with_columns("t", vec![Column::text("a"), Column::text("b")]);
        table.push_row(vec![Value::from("x"), Value::Null]).unwrap();
        assert_eq!(gen.column_names_sql(&table), "A,B");
        assert_eq!(gen.row_values_sql(&table, &table.rows()[0]), "'x',DEFAULT");
        assert!(gen.table_create_sql(&table).starts_with("CREATE TABLE \"t\" (A varchar(2) NULL"));
    }
}
