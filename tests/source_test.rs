//! Integration tests for delimited text sources.

use flate2::write::GzEncoder;
use flate2::Compression as GzLevel;
use sql_bulkload::source::{load_csv, load_source, CsvSource, TableSource};
use sql_bulkload::{ColumnKind, LoadConfig, Value};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_file(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_load_plain_csv_as_text() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "people.csv", b"id;name;joined\n1;Alice;2024-01-01\n2;Bob;\n");
    let table = CsvSource::new(&path).load().unwrap();
    assert_eq!(table.name(), "people");
    assert!(table.is_all_text());
    assert_eq!(table.rows()[1][2], Value::from(""));
}

#[test]
fn test_load_csv_with_type_detection() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "prices.csv",
        b"sku,price,updated\nA1,2.5,2024-01-01\nB2,3,2024-01-02 10:30:00\nC3,,\n",
    );
    let config = LoadConfig {
        detect_and_convert_types: true,
        ..Default::default()
    };
    let table = load_csv(&path, &config).unwrap();
    let kinds: Vec<ColumnKind> = table.columns().iter().map(|c| c.kind).collect();
    assert_eq!(
        kinds,
        vec![ColumnKind::Text, ColumnKind::Float, ColumnKind::Timestamp]
    );
    assert_eq!(table.rows()[0][1], Value::Float(2.5));
    assert_eq!(table.rows()[2][1], Value::Null);
    assert_eq!(table.rows()[1][2].to_string(), "2024-01-02 10:30:00");
}

#[test]
fn test_load_csv_without_detection_keeps_text() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "n.csv", b"n\n1\n2\n");
    let table = load_csv(&path, &LoadConfig::default()).unwrap();
    assert_eq!(table.columns()[0].kind, ColumnKind::Text);
}

#[test]
fn test_load_gzip_compressed() {
    let dir = TempDir::new().unwrap();
    let mut encoder = GzEncoder::new(Vec::new(), GzLevel::default());
    encoder.write_all(b"a\tb\n1\tx\n2\ty\n").unwrap();
    let path = write_file(&dir, "data.tsv.gz", &encoder.finish().unwrap());

    let source = CsvSource::new(&path).with_table_name("loaded");
    let config = LoadConfig {
        detect_and_convert_types: true,
        ..Default::default()
    };
    let table = load_source(&source, &config).unwrap();
    assert_eq!(table.name(), "loaded");
    assert_eq!(table.column_count(), 2);
    assert_eq!(table.columns()[0].kind, ColumnKind::Integer);
    assert_eq!(table.rows()[1], vec![Value::Integer(2), Value::from("y")]);
}

#[test]
fn test_fixed_delimiter_overrides_detection() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "pipes.csv", b"a|b,c\n1|2,3\n");
    let table = CsvSource::new(&path).with_delimiter(b'|').load().unwrap();
    let names: Vec<&str> = table.columns().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b,c"]);
}

#[test]
fn test_missing_file_is_io_error() {
    let err = CsvSource::new("/nonexistent/file.csv").load().unwrap_err();
    assert!(matches!(err, sql_bulkload::LoadError::Io(_)));
}
