//! SQLite driver backed by rusqlite.

use super::{declared_length, kind_from_type_name, Connection, Driver, RowSink};
use crate::config::DEFAULT_DATE_FORMATS;
use crate::dialect::Dialect;
use crate::error::{LoadError, Result};
use crate::infer::parse_timestamp;
use crate::table::{Column, ColumnKind, Value};
use rusqlite::types::ValueRef;
use std::path::Path;
use std::time::Duration;

/// Opens SQLite databases. `:memory:` or an empty string opens an in-memory one.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDriver;

impl Driver for SqliteDriver {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn open(&self, connection_string: &str) -> Result<Box<dyn Connection>> {
        let target = connection_string.trim();
        let conn = if target.is_empty() || target == ":memory:" {
            SqliteConnection::open_in_memory()?
        } else {
            SqliteConnection::open(Path::new(target))?
        };
        Ok(Box::new(conn))
    }
}

pub struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl SqliteConnection {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = rusqlite::Connection::open(path)
            .map_err(|e| LoadError::Connection(format!("{}: {}", path.display(), e)))?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory()
            .map_err(|e| LoadError::Connection(format!(":memory:: {}", e)))?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: rusqlite::Connection) -> Self {
        Self { conn }
    }

    pub fn inner(&self) -> &rusqlite::Connection {
        &self.conn
    }
}

impl Connection for SqliteConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn execute(&mut self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn begin(&mut self) -> Result<()> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn read(&mut self, sql: &str, sink: &mut dyn RowSink) -> Result<()> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut columns = Vec::with_capacity(stmt.column_count());
        for (decl, meta) in stmt.columns().iter().zip(stmt.columns_with_metadata()) {
            let declared = decl.decl_type().map(str::to_string);
            let mut column = Column {
                name: decl.name().to_string(),
                kind: declared
                    .as_deref()
                    .map_or(ColumnKind::Text, kind_from_type_name),
                max_length: declared.as_deref().and_then(declared_length),
                declared_type: declared,
                // Expressions have no origin column to write back to
                read_only: true,
                ..Default::default()
            };
            if let (Some(table), Some(origin)) = (meta.table_name(), meta.origin_name()) {
                let (_, _, _, primary_key, auto_increment) =
                    self.conn.column_metadata(None, table, origin)?;
                column.read_only = false;
                column.auto_increment = auto_increment;
                column.unique = is_unique(&self.conn, table, origin, primary_key)?;
            }
            columns.push(column);
        }
        sink.schema(&columns)?;

        let count = columns.len();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(count);
            for (i, column) in columns.iter().enumerate() {
                values.push(value_from_sqlite(row.get_ref(i)?, column.kind));
            }
            sink.row(values)?;
        }
        Ok(())
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.conn.busy_timeout(timeout.unwrap_or(Duration::ZERO))?;
        Ok(())
    }
}

/// Sole primary key column, or the only column of a unique index
fn is_unique(
    conn: &rusqlite::Connection,
    table: &str,
    column: &str,
    primary_key: bool,
) -> Result<bool> {
    if primary_key {
        let key_columns: i64 = conn.query_row(
            "select count(*) from pragma_table_info(?1) where pk > 0",
            [table],
            |r| r.get(0),
        )?;
        if key_columns == 1 {
            return Ok(true);
        }
    }
    let unique_indexes: i64 = conn.query_row(
        "select count(*) from pragma_index_list(?1) as il \
         where il.\"unique\" = 1 \
           and (select count(*) from pragma_index_info(il.name)) = 1 \
           and exists (select 1 from pragma_index_info(il.name) as ii where ii.name = ?2)",
        [table, column],
        |r| r.get(0),
    )?;
    Ok(unique_indexes > 0)
}

/// SQLite stores dates as text; those are parsed back when the column says so
fn value_from_sqlite(value: ValueRef<'_>, kind: ColumnKind) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::Integer(n),
        ValueRef::Real(x) => Value::Float(x),
        ValueRef::Text(s) => {
            let text = String::from_utf8_lossy(s);
            match kind {
                ColumnKind::Timestamp => parse_timestamp(&text, DEFAULT_DATE_FORMATS)
                    .map_or_else(|| Value::Text(text.into_owned()), Value::Timestamp),
                _ => Value::Text(text.into_owned()),
            }
        }
        ValueRef::Blob(b) => Value::Text(format!("<blob {} bytes>", b.len())),
    }
}
