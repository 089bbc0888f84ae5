//! Per-database rules for identifier quoting, default column types and
//! insert statement wrappers.
//!
//! [`Dialect::rules`] is a pure lookup table. Every value it returns is only a
//! default: the matching [`LoadConfig`] field wins when it is set.

use crate::config::{non_blank, LoadConfig};
use std::fmt;
use std::str::FromStr;

/// Target database kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    #[default]
    SqlServer,
    Oracle,
    Postgres,
    MySql,
    Sqlite,
    Firebird,
    Odbc,
    OleDb,
}

impl Dialect {
    pub const ALL: [Dialect; 8] = [
        Dialect::SqlServer,
        Dialect::Oracle,
        Dialect::Postgres,
        Dialect::MySql,
        Dialect::Sqlite,
        Dialect::Firebird,
        Dialect::Odbc,
        Dialect::OleDb,
    ];

    /// Default rules for this dialect
    pub fn rules(self) -> DialectRules {
        match self {
            Dialect::Oracle => DialectRules {
                dialect: self,
                quote_style: QuoteStyle::DoubleQuote,
                char_type: "varchar2",
                numeric_type: "number(18,5)",
                integer_type: "number(12)",
                datetime_type: "date",
                insert_start: "begin",
                insert_end: "end;",
                wide_char_limit: None,
            },
            Dialect::Postgres => DialectRules {
                dialect: self,
                quote_style: QuoteStyle::DoubleQuote,
                ..DialectRules::ansi(self)
            },
            Dialect::Sqlite => DialectRules {
                dialect: self,
                quote_style: QuoteStyle::Bare,
                ..DialectRules::ansi(self)
            },
            Dialect::Firebird => DialectRules::ansi(self),
            Dialect::MySql => DialectRules {
                quote_style: QuoteStyle::Backtick,
                integer_type: "int",
                datetime_type: "datetime",
                ..DialectRules::ansi(self)
            },
            Dialect::SqlServer => DialectRules {
                quote_style: QuoteStyle::Bracket,
                wide_char_limit: Some(8000),
                ..DialectRules::mssql_like(self)
            },
            Dialect::Odbc | Dialect::OleDb => DialectRules::mssql_like(self),
        }
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mssql" | "sqlserver" | "sql-server" | "tsql" => Ok(Dialect::SqlServer),
            "oracle" => Ok(Dialect::Oracle),
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "sqlite" => Ok(Dialect::Sqlite),
            "firebird" => Ok(Dialect::Firebird),
            "odbc" => Ok(Dialect::Odbc),
            "oledb" | "ole-db" => Ok(Dialect::OleDb),
            _ => Err(format!(
                "Unknown dialect: {}. Valid options: mssql, oracle, postgres, mysql, sqlite, firebird, odbc, oledb",
                s
            )),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::SqlServer => write!(f, "mssql"),
            Dialect::Oracle => write!(f, "oracle"),
            Dialect::Postgres => write!(f, "postgres"),
            Dialect::MySql => write!(f, "mysql"),
            Dialect::Sqlite => write!(f, "sqlite"),
            Dialect::Firebird => write!(f, "firebird"),
            Dialect::Odbc => write!(f, "odbc"),
            Dialect::OleDb => write!(f, "oledb"),
        }
    }
}

/// How identifiers are wrapped after sanitization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    /// `[name]`
    Bracket,
    /// `"name"`
    DoubleQuote,
    /// `` `name` ``
    Backtick,
    /// name emitted verbatim
    Bare,
    /// no quoting, spaces replaced with `_`
    Underscore,
}

impl QuoteStyle {
    pub fn apply(self, name: &str) -> String {
        match self {
            QuoteStyle::Bracket => format!("[{}]", name.replace(']', "]]")),
            QuoteStyle::DoubleQuote => format!("\"{}\"", name.replace('"', "\"\"")),
            QuoteStyle::Backtick => format!("`{}`", name.replace('`', "``")),
            QuoteStyle::Bare => name.to_string(),
            QuoteStyle::Underscore => name.replace(' ', "_"),
        }
    }
}

/// Defaults for one dialect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialectRules {
    pub dialect: Dialect,
    pub quote_style: QuoteStyle,
    pub char_type: &'static str,
    pub numeric_type: &'static str,
    pub integer_type: &'static str,
    pub datetime_type: &'static str,
    pub insert_start: &'static str,
    pub insert_end: &'static str,
    /// Auto-sized char columns wider than this render as `(max)`
    pub wide_char_limit: Option<usize>,
}

impl DialectRules {
    fn ansi(dialect: Dialect) -> Self {
        Self {
            dialect,
            quote_style: QuoteStyle::Underscore,
            char_type: "varchar",
            numeric_type: "numeric(18,5)",
            integer_type: "integer",
            datetime_type: "timestamp",
            insert_start: "",
            insert_end: "",
            wide_char_limit: None,
        }
    }

    fn mssql_like(dialect: Dialect) -> Self {
        Self {
            integer_type: "int",
            datetime_type: "datetime2",
            ..Self::ansi(dialect)
        }
    }

    pub fn char_type<'a>(&'a self, config: &'a LoadConfig) -> &'a str {
        non_blank(config.column_char_type.as_deref()).unwrap_or(self.char_type)
    }

    pub fn numeric_type<'a>(&'a self, config: &'a LoadConfig) -> &'a str {
        non_blank(config.column_numeric_type.as_deref()).unwrap_or(self.numeric_type)
    }

    pub fn integer_type<'a>(&'a self, config: &'a LoadConfig) -> &'a str {
        non_blank(config.column_integer_type.as_deref()).unwrap_or(self.integer_type)
    }

    pub fn datetime_type<'a>(&'a self, config: &'a LoadConfig) -> &'a str {
        non_blank(config.column_datetime_type.as_deref()).unwrap_or(self.datetime_type)
    }

    pub fn insert_start<'a>(&'a self, config: &'a LoadConfig) -> &'a str {
        config.insert_start().unwrap_or(self.insert_start)
    }

    pub fn insert_end<'a>(&'a self, config: &'a LoadConfig) -> &'a str {
        config.insert_end().unwrap_or(self.insert_end)
    }

    /// Wrap a generated insert batch with the start/end commands
    pub fn wrap_insert(&self, config: &LoadConfig, sql: &str) -> String {
        let start = self.insert_start(config);
        let end = self.insert_end(config);
        let mut out = String::with_capacity(sql.len() + start.len() + end.len() + 2);
        if !start.is_empty() {
            out.push_str(start);
            out.push(' ');
        }
        out.push_str(sql);
        if !end.is_empty() {
            out.push(' ');
            out.push_str(end);
        }
        out
    }
}
