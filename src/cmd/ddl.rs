//! DDL command: render the CREATE TABLE (and optionally INSERT) script for a
//! delimited text file in any dialect, without touching a database.

use super::{load_config, parse_delimiter};
use anyhow::{Context, Result};
use clap::Args;
use sql_bulkload::access::{Connection, RowSink};
use sql_bulkload::insert::BulkInserter;
use sql_bulkload::source::{load_source, CsvSource};
use sql_bulkload::sqlgen::SqlGenerator;
use sql_bulkload::{Dialect, LoadError};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

#[derive(Args, Debug)]
#[command(after_help = "Examples:
  sql-bulkload ddl people.csv --dialect mssql
  sql-bulkload ddl people.csv --dialect oracle --inserts -o load.sql
  sql-bulkload ddl people.csv --dialect postgres --detect-types --multi-row --inserts")]
pub struct DdlArgs {
    /// Delimited text file (supports .gz, .bz2, .xz, .zst compression)
    pub input: PathBuf,

    /// Target dialect: mssql, oracle, postgres, mysql, sqlite, firebird, odbc, oledb
    #[arg(short, long, default_value = "mssql")]
    pub dialect: String,

    /// Table name (default: input file name)
    #[arg(short, long)]
    pub table: Option<String>,

    /// YAML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Field delimiter (auto-detected if not specified)
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,

    /// The first line is data, not a header
    #[arg(long)]
    pub no_header: bool,

    /// Infer integer, float and timestamp columns
    #[arg(long)]
    pub detect_types: bool,

    /// Also print the INSERT statements
    #[arg(long)]
    pub inserts: bool,

    /// Use one multi-row INSERT per batch
    #[arg(long)]
    pub multi_row: bool,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn run(args: DdlArgs) -> Result<()> {
    let dialect: Dialect = args.dialect.parse().map_err(anyhow::Error::msg)?;

    let mut config = load_config(args.config.as_deref())?;
    config.detect_and_convert_types |= args.detect_types;
    config.use_multi_rows_insert |= args.multi_row;
    config.validate()?;

    let mut source = CsvSource::new(&args.input).with_header(!args.no_header);
    if let Some(delimiter) = args.delimiter {
        source = source.with_delimiter(delimiter);
    }
    if let Some(table) = &args.table {
        source = source.with_table_name(table);
    }
    let table = load_source(&source, &config)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let mut script = ScriptConnection::new(dialect);
    let generator = SqlGenerator::new(dialect, &config);
    script.push(&generator.table_create_sql(&table));
    if args.inserts {
        BulkInserter::with_generator(generator, &config).insert_table(&mut script, &table, false)?;
    }

    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout())),
    };
    for statement in &script.statements {
        writeln!(writer, "{}", statement)?;
    }
    writer.flush()?;
    Ok(())
}

/// Collects generated statements instead of running them
struct ScriptConnection {
    dialect: Dialect,
    statements: Vec<String>,
}

impl ScriptConnection {
    fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            statements: Vec::new(),
        }
    }

    fn push(&mut self, sql: &str) {
        let sql = sql.trim_end();
        if sql.ends_with(';') {
            self.statements.push(sql.to_string());
        } else {
            self.statements.push(format!("{};", sql));
        }
    }
}

impl Connection for ScriptConnection {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn execute(&mut self, sql: &str) -> sql_bulkload::Result<()> {
        self.push(sql);
        Ok(())
    }

    fn begin(&mut self) -> sql_bulkload::Result<()> {
        Ok(())
    }

    fn commit(&mut self) -> sql_bulkload::Result<()> {
        Ok(())
    }

    fn rollback(&mut self) -> sql_bulkload::Result<()> {
        Ok(())
    }

    fn read(&mut self, sql: &str, _sink: &mut dyn RowSink) -> sql_bulkload::Result<()> {
        Err(LoadError::load(sql, "script output cannot run queries"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sql_bulkload::table::DataTable;
    use sql_bulkload::LoadConfig;

    #[test]
    fn test_script_collects_inserts() {
        let config = LoadConfig {
            insert_burst_size: 2,
            ..Default::default()
        };
        let table = DataTable::from_text_rows(
            "people",
            &["name"],
            vec![
                vec![Some("a".to_string())],
                vec![Some("b".to_string())],
                vec![Some("c".to_string())],
            ],
        )
        .unwrap();
        let mut script = ScriptConnection::new(Dialect::Oracle);
        let mut inserter = BulkInserter::new(&script, &config);
        let stats = inserter.insert_table(&mut script, &table, false).unwrap();
        assert_eq!(stats.statements_executed, 2);
        assert_eq!(script.statements.len(), 2);
        assert!(script.statements[0].starts_with("begin insert into \"people\""));
        assert!(script.statements[1].ends_with("end;"));
    }
}
