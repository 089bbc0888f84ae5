//! Tabular sources that produce all-text [`DataTable`]s.
//!
//! [`CsvSource`] reads delimited text, optionally compressed. Other readers
//! (spreadsheets, for instance) plug in through [`TableSource`].

use crate::config::LoadConfig;
use crate::error::Result;
use crate::infer::detect_and_convert_types;
use crate::table::{Column, DataTable, Value};
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Delimiters tried when none is configured
const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Anything that can produce a table
pub trait TableSource {
    fn load(&self) -> Result<DataTable>;
}

/// Compression format detected from file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
    Xz,
    Zstd,
}

impl Compression {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("gz" | "gzip") => Compression::Gzip,
            Some("bz2" | "bzip2") => Compression::Bzip2,
            Some("xz" | "lzma") => Compression::Xz,
            Some("zst" | "zstd") => Compression::Zstd,
            _ => Compression::None,
        }
    }

    /// Wrap a reader with the matching decompressor
    pub fn wrap_reader<'a>(&self, reader: Box<dyn Read + 'a>) -> std::io::Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Compression::None => reader,
            Compression::Gzip => Box::new(flate2::read::GzDecoder::new(reader)),
            Compression::Bzip2 => Box::new(bzip2::read::BzDecoder::new(reader)),
            Compression::Xz => Box::new(xz2::read::XzDecoder::new(reader)),
            Compression::Zstd => Box::new(zstd::stream::read::Decoder::new(reader)?),
        })
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Compression::None => write!(f, "none"),
            Compression::Gzip => write!(f, "gzip"),
            Compression::Bzip2 => write!(f, "bzip2"),
            Compression::Xz => write!(f, "xz"),
            Compression::Zstd => write!(f, "zstd"),
        }
    }
}

/// Delimited text file reader
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    delimiter: Option<u8>,
    has_header: bool,
    table_name: Option<String>,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: None,
            has_header: true,
            table_name: None,
        }
    }

    /// Use a fixed delimiter instead of detecting one
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Without a header row, columns are named `Column1`, `Column2`, ...
    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Defaults to the file name without its extensions
    pub fn with_table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }

    fn default_table_name(&self) -> String {
        let mut stem = self.path.file_stem().map(PathBuf::from).unwrap_or_default();
        if Compression::from_path(&self.path) != Compression::None {
            stem = stem.file_stem().map(PathBuf::from).unwrap_or(stem);
        }
        stem.to_string_lossy().into_owned()
    }

    /// Read from any reader. Used by [`TableSource::load`] after decompression.
    pub fn read_from<R: Read>(&self, reader: R) -> Result<DataTable> {
        let mut reader = BufReader::new(reader);
        let mut first_line = String::new();
        reader.read_line(&mut first_line)?;
        let delimiter = self
            .delimiter
            .unwrap_or_else(|| detect_delimiter(&first_line));
        debug!(path = %self.path.display(), delimiter = %(delimiter as char), "reading delimited text");

        let input = Cursor::new(first_line.into_bytes()).chain(reader);
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(input);

        let name = self
            .table_name
            .clone()
            .unwrap_or_else(|| self.default_table_name());
        let mut table = DataTable::new(name);
        let mut records = csv_reader.records();

        if self.has_header {
            if let Some(header) = records.next() {
                for (i, field) in header?.iter().enumerate() {
                    let field = field.trim();
                    let column = if field.is_empty() {
                        generated_name(i)
                    } else {
                        field.to_string()
                    };
                    table.add_column(Column::text(column));
                }
            }
        }

        for record in records {
            let record = record?;
            while table.column_count() < record.len() {
                table.add_column(Column::text(generated_name(table.column_count())));
            }
            let mut row: Vec<Value> = record.iter().map(Value::from).collect();
            row.resize(table.column_count(), Value::Null);
            table.push_row(row)?;
        }
        Ok(table)
    }
}

impl TableSource for CsvSource {
    fn load(&self) -> Result<DataTable> {
        let compression = Compression::from_path(&self.path);
        let file = File::open(&self.path)?;
        let reader = compression.wrap_reader(Box::new(file))?;
        self.read_from(reader)
    }
}

/// Load any source, running type inference when the config asks for it
pub fn load_source(source: &dyn TableSource, config: &LoadConfig) -> Result<DataTable> {
    let table = source.load()?;
    if config.detect_and_convert_types {
        Ok(detect_and_convert_types(&table, config))
    } else {
        Ok(table)
    }
}

/// Load a delimited text file with a header row and a detected delimiter
pub fn load_csv(path: &Path, config: &LoadConfig) -> Result<DataTable> {
    load_source(&CsvSource::new(path), config)
}

/// The most frequent candidate delimiter in `line`, `,` when none appears.
///
/// Ties go to the earlier candidate.
pub fn detect_delimiter(line: &str) -> u8 {
    let mut best = (b',', 0);
    for &candidate in &CANDIDATE_DELIMITERS {
        let count = line.bytes().filter(|&b| b == candidate).count();
        if count > best.1 {
            best = (candidate, count);
        }
    }
    best.0
}

fn generated_name(index: usize) -> String {
    format!("Column{}", index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a,b,c\n"), b',');
        assert_eq!(detect_delimiter("a;b;c\n"), b';');
        assert_eq!(detect_delimiter("a\tb\tc\n"), b'\t');
        assert_eq!(detect_delimiter("a|b\n"), b'|');
        assert_eq!(detect_delimiter("single\n"), b',');
        assert_eq!(detect_delimiter("a;b,c\n"), b',');
        assert_eq!(detect_delimiter("a\tb|c\n"), b'\t');
    }

    #[test]
    fn test_compression_from_path() {
        assert_eq!(Compression::from_path(Path::new("a.csv.gz")), Compression::Gzip);
        assert_eq!(Compression::from_path(Path::new("a.csv.zst")), Compression::Zstd);
        assert_eq!(Compression::from_path(Path::new("a.csv")), Compression::None);
    }

    #[test]
    fn test_read_with_header_and_short_rows() {
        let source = CsvSource::new("people.csv");
        let table = source
            .read_from("name;age\nAlice;30\nBob\n;\n".as_bytes())
            .unwrap();
        assert_eq!(table.name(), "people");
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.rows()[1], vec![Value::from("Bob"), Value::Null]);
        assert_eq!(table.rows()[2], vec![Value::from(""), Value::from("")]);
        assert!(table.is_all_text());
    }

    #[test]
    fn test_read_without_header() {
        let source = CsvSource::new("data.csv.gz").with_header(false);
        let table = source.read_from("1,2\n3,4,5\n".as_bytes()).unwrap();
        assert_eq!(table.name(), "data");
        let names: Vec<&str> = table.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Column1", "Column2", "Column3"]);
        assert_eq!(table.rows()[0][2], Value::Null);
        assert_eq!(table.rows()[1][2], Value::from("5"));
    }

    #[test]
    fn test_duplicate_headers_are_renamed() {
        let table = CsvSource::new("t.csv")
            .read_from("id,id\n1,2\n".as_bytes())
            .unwrap();
        assert_eq!(table.columns()[1].name, "id_1");
    }
}
