mod compare;
mod ddl;
mod load;
mod output;
mod query;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use indicatif::{ProgressBar, ProgressStyle};
use sql_bulkload::access::{Connection, DriverRegistry, DuckDbDriver};
use sql_bulkload::{Dialect, LoadConfig};
use std::io;
use std::path::Path;

#[derive(Parser)]
#[command(name = "sql-bulkload")]
#[command(version)]
#[command(about = "Load delimited text and query results into SQL databases", long_about = None)]
pub struct Cli {
    /// Verbose output (debug logging, overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load a delimited text file into a database table
    Load(load::LoadArgs),

    /// Print the CREATE TABLE and INSERT script for a delimited text file
    Ddl(ddl::DdlArgs),

    /// Run a query and print the result
    Query(query::QueryArgs),

    /// Check whether two queries return identical tables
    Compare(compare::CompareArgs),

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Database engine behind `--db`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Engine {
    Sqlite,
    Duckdb,
}

impl Engine {
    fn dialect(self) -> Dialect {
        match self {
            Engine::Sqlite => Dialect::Sqlite,
            Engine::Duckdb => Dialect::Postgres,
        }
    }
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Load(args) => load::run(args),
        Commands::Ddl(args) => ddl::run(args),
        Commands::Query(args) => query::run(args),
        Commands::Compare(args) => compare::run(args),
        Commands::Completions { shell } => {
            generate(
                shell,
                &mut Cli::command(),
                "sql-bulkload",
                &mut io::stdout(),
            );
            Ok(())
        }
    }
}

fn registry() -> DriverRegistry {
    DriverRegistry::default().with_driver(Box::new(DuckDbDriver))
}

fn open(registry: &DriverRegistry, engine: Engine, db: &str) -> Result<Box<dyn Connection>> {
    registry
        .open(engine.dialect(), db)
        .with_context(|| format!("Failed to open {:?} database '{}'", engine, db))
}

/// Configuration from `--config`, or defaults
fn load_config(path: Option<&Path>) -> Result<LoadConfig> {
    match path {
        Some(path) => LoadConfig::load(path)
            .with_context(|| format!("Failed to read config file: {}", path.display())),
        None => Ok(LoadConfig::default()),
    }
}

/// Single-byte delimiter; `\t` and `tab` mean a tab
fn parse_delimiter(s: &str) -> std::result::Result<u8, String> {
    match s {
        "\\t" | "tab" => Ok(b'\t'),
        _ if s.len() == 1 => Ok(s.as_bytes()[0]),
        _ => Err(format!("delimiter must be a single byte, got '{}'", s)),
    }
}

fn row_progress_bar(rows: usize) -> ProgressBar {
    let pb = ProgressBar::new(rows as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} rows ({percent}%)")
    {
        pb.set_style(style.progress_chars("=>-"));
    }
    pb
}
