//! Query command: run SQL against a database and print the result.

use super::output::{OutputFormat, TableFormatter};
use super::{load_config, open, registry, Engine};
use anyhow::{Context, Result};
use clap::Args;
use sql_bulkload::access::{ConnectionRef, DataAccess};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Args, Debug)]
#[command(after_help = "Examples:
  sql-bulkload query --db app.sqlite \"SELECT COUNT(*) FROM people\"
  sql-bulkload query --db app.sqlite \"SELECT * FROM people\" -f json
  sql-bulkload query --db app.sqlite \"SELECT * FROM people\" -o people.csv -f csv
  sql-bulkload query --db app.sqlite \"DELETE FROM people; VACUUM\" --execute")]
pub struct QueryArgs {
    /// SQL to run
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Database file
    #[arg(long, value_name = "PATH")]
    pub db: String,

    /// Database engine
    #[arg(long, value_enum, default_value = "sqlite")]
    pub engine: Engine,

    /// Output format: table, json, jsonl, csv, tsv
    #[arg(short, long, default_value = "table")]
    pub format: String,

    /// Write output to file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// YAML configuration file (timeouts, bulk fill)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Run as statements that return no rows
    #[arg(long)]
    pub execute: bool,

    /// Split the text on this separator when used with --execute
    #[arg(long, value_name = "SEP", requires = "execute")]
    pub separator: Option<String>,

    /// Print only the first column of the first row
    #[arg(long, conflicts_with = "execute")]
    pub scalar: bool,

    /// Show query execution time
    #[arg(long)]
    pub timing: bool,
}

pub fn run(args: QueryArgs) -> Result<()> {
    let format: OutputFormat = args.format.parse().map_err(anyhow::Error::msg)?;
    let config = load_config(args.config.as_deref())?;
    let registry = registry();
    let mut conn = open(&registry, args.engine, &args.db)?;
    let mut access = DataAccess::new(&registry, &config);
    let start = Instant::now();

    if args.execute {
        let count = access
            .execute_non_query(
                ConnectionRef::Borrowed(conn.as_mut()),
                &args.query,
                args.separator.as_deref(),
            )
            .context("Statement failed")?;
        println!("{} statement{} executed", count, if count == 1 { "" } else { "s" });
    } else if args.scalar {
        let value = access
            .execute_scalar(ConnectionRef::Borrowed(conn.as_mut()), &args.query)
            .context("Query failed")?;
        println!("{}", value.map(|v| v.to_string()).unwrap_or_else(|| "NULL".to_string()));
    } else {
        let table = access
            .load_table(ConnectionRef::Borrowed(conn.as_mut()), &args.query)
            .context("Query failed")?;
        let mut writer: Box<dyn Write> = match &args.output {
            Some(path) => Box::new(BufWriter::new(File::create(path).with_context(|| {
                format!("Failed to create output file: {}", path.display())
            })?)),
            None => Box::new(BufWriter::new(io::stdout())),
        };
        TableFormatter::write(&table, format, &mut writer)?;
        writer.flush()?;
    }

    if args.timing {
        eprintln!("Query time: {:.3}s", start.elapsed().as_secs_f64());
    }
    Ok(())
}
