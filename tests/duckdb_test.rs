//! Integration tests for the DuckDB driver.

use sql_bulkload::access::{
    Connection, ConnectionRef, DataAccess, DriverRegistry, DuckDbConnection, DuckDbDriver,
};
use sql_bulkload::compare::are_tables_identical;
use sql_bulkload::infer::detect_and_convert_types;
use sql_bulkload::insert::BulkInserter;
use sql_bulkload::{ColumnKind, DataTable, Dialect, LoadConfig, LoadError, Value};
use tempfile::TempDir;

fn orders() -> DataTable {
    DataTable::from_text_rows(
        "orders",
        &["id", "amount", "placed_at", "status"],
        vec![
            vec![
                Some("1".into()),
                Some("99.99".into()),
                Some("2024-01-01 10:00:00".into()),
                Some("completed".into()),
            ],
            vec![
                Some("2".into()),
                Some("149.5".into()),
                Some("2024-01-02".into()),
                Some("it's pending".into()),
            ],
            vec![Some("3".into()), None, None, None],
        ],
    )
    .unwrap()
}

#[test]
fn test_connection_reports_postgres_dialect() {
    let conn = DuckDbConnection::open_in_memory().unwrap();
    assert_eq!(conn.dialect(), Dialect::Postgres);
}

#[test]
fn test_not_in_default_registry() {
    let registry = DriverRegistry::default();
    assert!(!registry.contains(Dialect::Postgres));
    let registry = registry.with_driver(Box::new(DuckDbDriver));
    assert!(registry.contains(Dialect::Postgres));
}

#[test]
fn test_round_trip_through_bulk_inserter() {
    let config = LoadConfig {
        insert_burst_size: 2,
        use_multi_rows_insert: true,
        ..Default::default()
    };
    let typed = detect_and_convert_types(&orders(), &config);
    assert_eq!(typed.columns()[1].kind, ColumnKind::Float);

    let mut conn = DuckDbConnection::open_in_memory().unwrap();
    let mut inserter = BulkInserter::new(&conn, &config);
    let stats = inserter
        .load_table_to_database(&mut conn, &typed, true, false)
        .unwrap();
    assert_eq!(stats.rows_inserted, 3);
    assert_eq!(stats.statements_executed, 2);

    let registry = DriverRegistry::empty().with_driver(Box::new(DuckDbDriver));
    let mut access = DataAccess::new(&registry, &config);
    let loaded = access
        .load_table(
            ConnectionRef::Borrowed(&mut conn),
            "SELECT * FROM \"orders\" ORDER BY \"id\"",
        )
        .unwrap();
    assert_eq!(loaded.columns()[0].kind, ColumnKind::Integer);
    assert_eq!(loaded.columns()[2].kind, ColumnKind::Timestamp);
    assert_eq!(loaded.rows()[1][3], Value::from("it's pending"));
    assert!(are_tables_identical(&typed, &loaded));
}

#[test]
fn test_failed_batch_rolls_back() {
    let config = LoadConfig {
        insert_burst_size: 1,
        ..Default::default()
    };
    let mut conn = DuckDbConnection::open_in_memory().unwrap();
    conn.execute("CREATE TABLE orders (id INTEGER NOT NULL, amount DOUBLE, placed_at TIMESTAMP, status VARCHAR)")
        .unwrap();

    let typed = detect_and_convert_types(&orders(), &config);
    let mut bad = typed.clone();
    bad.set_value(2, 0, Value::Null);

    let mut inserter = BulkInserter::new(&conn, &config);
    let err = inserter.insert_table(&mut conn, &bad, false).unwrap_err();
    assert!(matches!(err, LoadError::Execute { .. }));

    let registry = DriverRegistry::empty();
    let mut access = DataAccess::new(&registry, &config);
    let count = access
        .execute_scalar(
            ConnectionRef::Borrowed(&mut conn),
            "SELECT COUNT(*) FROM orders",
        )
        .unwrap();
    assert_eq!(count, Some(Value::Integer(0)));
}

#[test]
fn test_owned_connection_to_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("test.duckdb");
    let cs = path.to_string_lossy().into_owned();

    let registry = DriverRegistry::empty().with_driver(Box::new(DuckDbDriver));
    let config = LoadConfig::default();
    let mut access = DataAccess::new(&registry, &config);
    access
        .execute_non_query(
            ConnectionRef::owned(Dialect::Postgres, &cs),
            "CREATE TABLE t (a INTEGER);\nINSERT INTO t VALUES (1), (2);",
            None,
        )
        .unwrap();

    let values = access
        .load_string_list(
            ConnectionRef::owned(Dialect::Postgres, &cs),
            "SELECT a FROM t ORDER BY a",
        )
        .unwrap();
    assert_eq!(values, vec!["1", "2"]);
}

#[test]
fn test_load_table_uses_native_fill() {
    let config = LoadConfig {
        use_bulk_fill: true,
        ..Default::default()
    };
    let mut conn = DuckDbConnection::open_in_memory().unwrap();
    conn.execute("CREATE TABLE t (a INTEGER, b VARCHAR); INSERT INTO t VALUES (1, 'x'), (2, 'y');")
        .unwrap();

    let registry = DriverRegistry::empty();
    let mut access = DataAccess::new(&registry, &config);
    let table = access
        .load_table(ConnectionRef::Borrowed(&mut conn), "SELECT * FROM t ORDER BY a")
        .unwrap();
    assert_eq!(table.row_count(), 2);
    assert_eq!(table.rows()[1], vec![Value::Integer(2), Value::from("y")]);

    let err = access
        .load_table(ConnectionRef::Borrowed(&mut conn), "SELECT * FROM missing")
        .unwrap_err();
    assert_eq!(err.sql(), Some("SELECT * FROM missing"));
}
