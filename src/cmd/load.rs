//! Load command: delimited text file into a database table.

use super::{load_config, open, parse_delimiter, registry, row_progress_bar, Engine};
use anyhow::{Context, Result};
use clap::Args;
use sql_bulkload::insert::BulkInserter;
use sql_bulkload::source::{load_source, CsvSource};
use std::path::PathBuf;

#[derive(Args, Debug)]
#[command(after_help = "Examples:
  sql-bulkload load people.csv --db app.sqlite --create
  sql-bulkload load orders.csv.gz --db app.sqlite -t orders --delete-first --detect-types
  sql-bulkload load data.tsv --db warehouse.duckdb --engine duckdb --create --multi-row")]
pub struct LoadArgs {
    /// Delimited text file (supports .gz, .bz2, .xz, .zst compression)
    pub input: PathBuf,

    /// Target database file
    #[arg(long, value_name = "PATH")]
    pub db: String,

    /// Database engine
    #[arg(long, value_enum, default_value = "sqlite")]
    pub engine: Engine,

    /// Target table name (default: input file name)
    #[arg(short, long)]
    pub table: Option<String>,

    /// Drop and create the table before inserting
    #[arg(long)]
    pub create: bool,

    /// Delete existing rows inside the insert transaction
    #[arg(long)]
    pub delete_first: bool,

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

    /// Use one multi-row INSERT per batch
    #[arg(long)]
    pub multi_row: bool,

    /// Rows per executed INSERT batch
    #[arg(long, value_name = "ROWS")]
    pub burst_size: Option<usize>,

    /// Write every executed statement to this file
    #[arg(long, value_name = "FILE")]
    pub debug_log: Option<PathBuf>,

    /// Show insert progress
    #[arg(short, long)]
    pub progress: bool,
}

pub fn run(args: LoadArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    config.detect_and_convert_types |= args.detect_types;
    config.use_multi_rows_insert |= args.multi_row;
    config.debug_mode |= args.debug_log.is_some();
    if let Some(burst) = args.burst_size {
        config.insert_burst_size = burst;
    }
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

    let registry = registry();
    let mut conn = open(&registry, args.engine, &args.db)?;
    let mut inserter = BulkInserter::new(conn.as_ref(), &config);
    let progress = args.progress.then(|| row_progress_bar(table.row_count()));
    if let Some(pb) = &progress {
        inserter = inserter.with_progress(pb.clone());
    }

    let result =
        inserter.load_table_to_database(conn.as_mut(), &table, args.create, args.delete_first);
    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }

    // Written even when the load failed
    if let Some(path) = &args.debug_log {
        inserter
            .debug_log()
            .write_to(path)
            .with_context(|| format!("Failed to write debug log: {}", path.display()))?;
    }

    let stats = result.with_context(|| format!("Failed to load table '{}'", table.name()))?;
    println!("{}: {}", table.name(), stats);
    Ok(())
}
