//! Generic data access across dialect-specific connections.
//!
//! Drivers are looked up by [`Dialect`] in a [`DriverRegistry`] and hand out
//! [`Connection`] objects. Query results are materialized into a
//! [`DataTable`] either through the driver's native bulk fill or by reading
//! row by row through a [`RowSink`].
//!
//! Every [`DataAccess`] operation takes a [`ConnectionRef`]. A connection
//! string makes the operation open (and always drop) its own connection, an
//! open connection is borrowed and left open.

pub mod duckdb;
pub mod sqlite;

pub use self::duckdb::{DuckDbConnection, DuckDbDriver};
pub use self::sqlite::{SqliteConnection, SqliteDriver};

use crate::config::LoadConfig;
use crate::debug_log::DebugLog;
use crate::dialect::Dialect;
use crate::error::{LoadError, Result};
use crate::table::{Column, ColumnKind, DataTable, Row, Value};
use ahash::AHashMap;
use std::time::Duration;
use tracing::debug;

/// Receives a query result: the schema once, then every row in order
pub trait RowSink {
    fn schema(&mut self, columns: &[Column]) -> Result<()>;
    fn row(&mut self, row: Row) -> Result<()>;
}

/// An open, dialect-specific database connection
pub trait Connection {
    fn dialect(&self) -> Dialect;

    /// Run statement text that returns no rows. May hold several statements.
    fn execute(&mut self, sql: &str) -> Result<()>;

    fn begin(&mut self) -> Result<()>;
    fn commit(&mut self) -> Result<()>;
    fn rollback(&mut self) -> Result<()>;

    /// Run a query and stream its schema and rows into `sink`
    fn read(&mut self, sql: &str, sink: &mut dyn RowSink) -> Result<()>;

    /// Native whole-result fill, `None` when the driver has none
    fn bulk_fill(&mut self, _sql: &str) -> Option<Result<DataTable>> {
        None
    }

    /// `None` removes any timeout
    fn set_timeout(&mut self, _timeout: Option<Duration>) -> Result<()> {
        Ok(())
    }
}

/// Opens connections for one dialect
pub trait Driver {
    fn dialect(&self) -> Dialect;
    fn open(&self, connection_string: &str) -> Result<Box<dyn Connection>>;
}

/// Dialect to driver lookup
pub struct DriverRegistry {
    drivers: AHashMap<Dialect, Box<dyn Driver>>,
}

impl DriverRegistry {
    /// A registry with no drivers
    pub fn empty() -> Self {
        Self {
            drivers: AHashMap::new(),
        }
    }

    /// Register a driver, replacing any previous one for the same dialect
    pub fn register(&mut self, driver: Box<dyn Driver>) {
        self.drivers.insert(driver.dialect(), driver);
    }

    pub fn with_driver(mut self, driver: Box<dyn Driver>) -> Self {
        self.register(driver);
        self
    }

    pub fn contains(&self, dialect: Dialect) -> bool {
        self.drivers.contains_key(&dialect)
    }

    pub fn open(&self, dialect: Dialect, connection_string: &str) -> Result<Box<dyn Connection>> {
        let driver = self
            .drivers
            .get(&dialect)
            .ok_or(LoadError::NoDriver(dialect))?;
        debug!(%dialect, "opening connection");
        driver.open(connection_string)
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::empty().with_driver(Box::new(SqliteDriver))
    }
}

/// Where an operation gets its connection from
pub enum ConnectionRef<'a> {
    /// Open a connection for the duration of the call
    Owned {
        dialect: Dialect,
        connection_string: &'a str,
    },
    /// Use the caller's open connection and leave it open
    Borrowed(&'a mut dyn Connection),
}

impl<'a> ConnectionRef<'a> {
    pub fn owned(dialect: Dialect, connection_string: &'a str) -> Self {
        ConnectionRef::Owned {
            dialect,
            connection_string,
        }
    }
}

/// Replaceable table loading strategy
pub trait TableLoader {
    fn load_table(
        &self,
        conn: &mut dyn Connection,
        sql: &str,
        config: &LoadConfig,
    ) -> Result<DataTable>;
}

/// Builds a [`DataTable`] from a streamed result
#[derive(Default)]
pub struct TableBuilder {
    table: DataTable,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> DataTable {
        self.table
    }
}

impl RowSink for TableBuilder {
    fn schema(&mut self, columns: &[Column]) -> Result<()> {
        // add_column renames duplicates with the running column count
        for column in columns {
            self.table.add_column(column.clone());
        }
        Ok(())
    }

    fn row(&mut self, row: Row) -> Result<()> {
        self.table.push_row(row)
    }
}

/// Collects the first column of every row
#[derive(Default)]
struct FirstColumn {
    values: Vec<Value>,
    limit: Option<usize>,
}

impl RowSink for FirstColumn {
    fn schema(&mut self, _columns: &[Column]) -> Result<()> {
        Ok(())
    }

    fn row(&mut self, row: Row) -> Result<()> {
        if self.limit.map_or(true, |limit| self.values.len() < limit) {
            self.values.push(row.into_iter().next().unwrap_or_default());
        }
        Ok(())
    }
}

/// Run `f` against the connection named by `target`.
///
/// An owned connection is dropped before this returns, on success and on error.
fn with_connection<T>(
    registry: &DriverRegistry,
    target: ConnectionRef<'_>,
    f: impl FnOnce(&mut dyn Connection) -> Result<T>,
) -> Result<T> {
    match target {
        ConnectionRef::Borrowed(conn) => f(conn),
        ConnectionRef::Owned {
            dialect,
            connection_string,
        } => {
            let mut conn = registry.open(dialect, connection_string)?;
            let result = f(conn.as_mut());
            drop(conn);
            debug!(%dialect, "closed owned connection");
            result
        }
    }
}

/// Query and statement execution over any registered driver
pub struct DataAccess<'a> {
    registry: &'a DriverRegistry,
    config: &'a LoadConfig,
    loader: Option<&'a dyn TableLoader>,
    debug_log: DebugLog,
}

impl<'a> DataAccess<'a> {
    pub fn new(registry: &'a DriverRegistry, config: &'a LoadConfig) -> Self {
        Self {
            registry,
            config,
            loader: None,
            debug_log: DebugLog::new(config.debug_mode),
        }
    }

    /// Replace the built-in `load_table` with a caller strategy
    pub fn with_loader(mut self, loader: &'a dyn TableLoader) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn debug_log(&self) -> &DebugLog {
        &self.debug_log
    }

    pub fn into_debug_log(self) -> DebugLog {
        self.debug_log
    }

    /// Run a query and materialize the full result
    pub fn load_table(&mut self, target: ConnectionRef<'_>, sql: &str) -> Result<DataTable> {
        let config = self.config;
        let loader = self.loader;
        let debug_log = &mut self.debug_log;
        with_connection(self.registry, target, |conn| {
            debug_log.record(sql);
            if let Some(loader) = loader {
                return loader.load_table(conn, sql, config);
            }
            read_table(conn, sql, config)
        })
    }

    /// First column of every row, rendered as text
    pub fn load_string_list(&mut self, target: ConnectionRef<'_>, sql: &str) -> Result<Vec<String>> {
        let values = self.first_column(target, sql, None)?;
        Ok(values.iter().map(Value::to_string).collect())
    }

    /// First column of the first row, `None` when the query returns no rows
    pub fn execute_scalar(&mut self, target: ConnectionRef<'_>, sql: &str) -> Result<Option<Value>> {
        let values = self.first_column(target, sql, Some(1))?;
        Ok(values.into_iter().next())
    }

    /// Execute statement text that returns no rows.
    ///
    /// With a `separator`, the text is split on it and every non-blank part is
    /// executed on its own. Returns the number of executions.
    pub fn execute_non_query(
        &mut self,
        target: ConnectionRef<'_>,
        sql: &str,
        separator: Option<&str>,
    ) -> Result<usize> {
        let timeout = self.config.execute_timeout();
        let debug_log = &mut self.debug_log;
        with_connection(self.registry, target, |conn| {
            conn.set_timeout(timeout)?;
            let parts: Vec<&str> = match separator.filter(|s| !s.is_empty()) {
                Some(sep) => sql.split(sep).filter(|p| !p.trim().is_empty()).collect(),
                None => vec![sql],
            };
            for part in &parts {
                debug_log.record(part);
                debug!(sql = %part, "executing statement");
                conn.execute(part).map_err(|e| LoadError::execute(*part, e))?;
            }
            Ok(parts.len())
        })
    }

    fn first_column(
        &mut self,
        target: ConnectionRef<'_>,
        sql: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Value>> {
        let timeout = self.config.select_timeout();
        let debug_log = &mut self.debug_log;
        with_connection(self.registry, target, |conn| {
            debug_log.record(sql);
            conn.set_timeout(timeout)?;
            let mut sink = FirstColumn {
                limit,
                ..Default::default()
            };
            conn.read(sql, &mut sink)
                .map_err(|e| LoadError::load(sql, e))?;
            Ok(sink.values)
        })
    }
}

/// Built-in load: native fill when enabled and available, else row by row
pub fn read_table(conn: &mut dyn Connection, sql: &str, config: &LoadConfig) -> Result<DataTable> {
    if config.load_burst_size > 0 {
        debug!(
            burst = config.load_burst_size,
            sort_column = config.load_sort_column.as_deref().unwrap_or(""),
            "paged reads are not supported, loading the full result"
        );
    }
    conn.set_timeout(config.select_timeout())?;

    if config.use_bulk_fill {
        if let Some(result) = conn.bulk_fill(sql) {
            return result.map_err(|e| LoadError::load(sql, e));
        }
        debug!(dialect = %conn.dialect(), "no native bulk fill, reading row by row");
    }

    let mut builder = TableBuilder::new();
    conn.read(sql, &mut builder)
        .map_err(|e| LoadError::load(sql, e))?;
    let table = builder.finish();
    debug!(
        rows = table.row_count(),
        columns = table.column_count(),
        "loaded table"
    );
    Ok(table)
}

/// Column kind from a driver-reported type name
pub(crate) fn kind_from_type_name(type_name: &str) -> ColumnKind {
    let upper = type_name.to_ascii_uppercase();
    if upper.contains("INTERVAL") {
        ColumnKind::Text
    } else if upper.contains("INT") {
        ColumnKind::Integer
    } else if ["REAL", "FLOA", "DOUB", "NUMERIC", "DECIMAL", "NUMBER"]
        .iter()
        .any(|t| upper.contains(t))
    {
        ColumnKind::Float
    } else if upper.contains("DATE") || upper.contains("TIMESTAMP") {
        ColumnKind::Timestamp
    } else {
        ColumnKind::Text
    }
}

/// Length from a declared type such as `varchar(20)`
pub(crate) fn declared_length(type_name: &str) -> Option<usize> {
    let open = type_name.find('(')?;
    let close = type_name[open..].find(')')? + open;
    type_name[open + 1..close].trim().parse().ok()
}
