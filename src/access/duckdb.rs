//! DuckDB driver.
//!
//! DuckDB follows PostgreSQL identifier and type rules closely enough that the
//! connection reports [`Dialect::Postgres`]. The driver is not part of the
//! default registry because it would shadow a real PostgreSQL driver.

use super::{kind_from_type_name, Connection, Driver, RowSink};
use crate::dialect::Dialect;
use crate::error::{LoadError, Result};
use crate::table::{Column, DataTable, Row, Value};
use ::duckdb::types::{TimeUnit, ValueRef};
use chrono::{DateTime, NaiveDate};
use std::path::Path;

/// Days from 0001-01-01 to 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

#[derive(Debug, Default, Clone, Copy)]
pub struct DuckDbDriver;

impl Driver for DuckDbDriver {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn open(&self, connection_string: &str) -> Result<Box<dyn Connection>> {
        let target = connection_string.trim();
        let conn = if target.is_empty() || target == ":memory:" {
            DuckDbConnection::open_in_memory()?
        } else {
            DuckDbConnection::open(Path::new(target))?
        };
        Ok(Box::new(conn))
    }
}

pub struct DuckDbConnection {
    conn: ::duckdb::Connection,
}

impl DuckDbConnection {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = ::duckdb::Connection::open(path)
            .map_err(|e| LoadError::Connection(format!("{}: {}", path.display(), e)))?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = ::duckdb::Connection::open_in_memory()
            .map_err(|e| LoadError::Connection(format!("Failed to create in-memory DuckDB database: {}", e)))?;
        Ok(Self { conn })
    }
}

impl Connection for DuckDbConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn execute(&mut self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn begin(&mut self) -> Result<()> {
        self.conn.execute_batch("BEGIN TRANSACTION")?;
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
        let (columns, rows) = self.fetch(sql)?;
        sink.schema(&columns)?;
        for row in rows {
            sink.row(row)?;
        }
        Ok(())
    }

    fn bulk_fill(&mut self, sql: &str) -> Option<Result<DataTable>> {
        Some(self.fetch(sql).and_then(|(columns, rows)| {
            let mut table = DataTable::with_columns("", columns);
            for row in rows {
                table.push_row(row)?;
            }
            Ok(table)
        }))
    }
}

impl DuckDbConnection {
    /// Run a query and collect the whole result.
    ///
    /// Column metadata is only available once the statement has run, so the
    /// rows are read before the schema.
    fn fetch(&mut self, sql: &str) -> Result<(Vec<Column>, Vec<Row>)> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows_result = stmt.query([])?;

        let mut rows: Vec<Row> = Vec::new();
        let mut column_count = 0;
        while let Some(row) = rows_result.next()? {
            if column_count == 0 {
                column_count = row.as_ref().column_count();
            }
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                values.push(value_from_duckdb(row.get_ref(i)?));
            }
            rows.push(values);
        }
        drop(rows_result);

        let columns: Vec<Column> = (0..stmt.column_count())
            .map(|i| {
                let type_name = format!("{:?}", stmt.column_type(i));
                Column {
                    name: stmt
                        .column_name(i)
                        .map(|s| s.to_string())
                        .unwrap_or_else(|_| format!("col{}", i)),
                    kind: kind_from_type_name(&type_name),
                    declared_type: Some(type_name),
                    ..Default::default()
                }
            })
            .collect();

        Ok((columns, rows))
    }
}

fn value_from_duckdb(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Boolean(b) => Value::Integer(i64::from(b)),
        ValueRef::TinyInt(n) => Value::Integer(n.into()),
        ValueRef::SmallInt(n) => Value::Integer(n.into()),
        ValueRef::Int(n) => Value::Integer(n.into()),
        ValueRef::BigInt(n) => Value::Integer(n),
        ValueRef::UTinyInt(n) => Value::Integer(n.into()),
        ValueRef::USmallInt(n) => Value::Integer(n.into()),
        ValueRef::UInt(n) => Value::Integer(n.into()),
        ValueRef::UBigInt(n) => {
            i64::try_from(n).map_or_else(|_| Value::Text(n.to_string()), Value::Integer)
        }
        ValueRef::HugeInt(n) => {
            i64::try_from(n).map_or_else(|_| Value::Text(n.to_string()), Value::Integer)
        }
        ValueRef::Float(x) => Value::Float(x.into()),
        ValueRef::Double(x) => Value::Float(x),
        ValueRef::Decimal(d) => d
            .to_string()
            .parse::<f64>()
            .map_or_else(|_| Value::Text(d.to_string()), Value::Float),
        ValueRef::Text(s) => Value::Text(String::from_utf8_lossy(s).into_owned()),
        ValueRef::Blob(b) => Value::Text(format!("<blob {} bytes>", b.len())),
        ValueRef::Timestamp(unit, ts) => {
            let micros = match unit {
                TimeUnit::Second => ts.saturating_mul(1_000_000),
                TimeUnit::Millisecond => ts.saturating_mul(1_000),
                TimeUnit::Microsecond => ts,
                TimeUnit::Nanosecond => ts / 1_000,
            };
            DateTime::from_timestamp_micros(micros)
                .map_or_else(|| Value::Text(ts.to_string()), |dt| Value::Timestamp(dt.naive_utc()))
        }
        ValueRef::Date32(days) => NaiveDate::from_num_days_from_ce_opt(UNIX_EPOCH_DAYS_FROM_CE + days)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map_or_else(|| Value::Text(days.to_string()), Value::Timestamp),
        other => Value::Text(format!("{:?}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::TableBuilder;
    use crate::table::ColumnKind;

    #[test]
    fn test_read_typed_values() {
        let mut conn = DuckDbConnection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE t (id INTEGER, price DECIMAL(18,5), name VARCHAR, at TIMESTAMP, d DATE);
             INSERT INTO t VALUES (1, 2.5, 'a', '2024-01-02 03:04:05', '2024-05-06');",
        )
        .unwrap();

        let mut builder = TableBuilder::new();
        conn.read("SELECT * FROM t", &mut builder).unwrap();
        let table = builder.finish();
        assert_eq!(table.column_count(), 5);
        assert_eq!(table.columns()[0].kind, ColumnKind::Integer);
        assert_eq!(table.columns()[2].kind, ColumnKind::Text);
        let row = &table.rows()[0];
        assert_eq!(row[0], Value::Integer(1));
        assert_eq!(row[1], Value::Float(2.5));
        assert_eq!(row[2], Value::from("a"));
        assert_eq!(row[3].to_string(), "2024-01-02 03:04:05");
        assert_eq!(row[4].to_string(), "2024-05-06 00:00:00");
    }

    #[test]
    fn test_empty_result_still_has_schema() {
        let mut conn = DuckDbConnection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE t (a INTEGER, b VARCHAR)").unwrap();
        let mut builder = TableBuilder::new();
        conn.read("SELECT * FROM t", &mut builder).unwrap();
        let table = builder.finish();
        assert_eq!(table.column_count(), 2);
        assert!(table.is_empty());
    }

    #[test]
    fn test_bulk_fill_matches_row_reading() {
        let mut conn = DuckDbConnection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE t (a INTEGER, b VARCHAR);
             INSERT INTO t VALUES (1, 'x'), (2, NULL);",
        )
        .unwrap();

        let filled = conn.bulk_fill("SELECT a, b, a AS a FROM t ORDER BY a").unwrap().unwrap();
        let mut builder = TableBuilder::new();
        conn.read("SELECT a, b, a AS a FROM t ORDER BY a", &mut builder)
            .unwrap();
        assert_eq!(filled, builder.finish());
        assert_eq!(filled.columns()[2].name, "a_2");
        assert_eq!(filled.rows()[1][1], Value::Null);

        let err = conn.bulk_fill("SELECT * FROM missing").unwrap().unwrap_err();
        assert!(matches!(err, LoadError::DuckDb(_)));
    }
}
