//! Compare command: run two queries and check that their results match.

use super::{load_config, open, registry, Engine};
use anyhow::{bail, Context, Result};
use clap::Args;
use sql_bulkload::access::{ConnectionRef, DataAccess};
use sql_bulkload::compare::{are_tables_identical, first_difference};
use std::path::PathBuf;

#[derive(Args, Debug)]
#[command(after_help = "Examples:
  sql-bulkload compare --db app.sqlite \"SELECT * FROM people\" \"SELECT * FROM people_backup\"")]
pub struct CompareArgs {
    /// First query
    pub left: String,

    /// Second query
    pub right: String,

    /// Database file
    #[arg(long, value_name = "PATH")]
    pub db: String,

    /// Database engine
    #[arg(long, value_enum, default_value = "sqlite")]
    pub engine: Engine,

    /// YAML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

pub fn run(args: CompareArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let registry = registry();
    let mut conn = open(&registry, args.engine, &args.db)?;
    let mut access = DataAccess::new(&registry, &config);

    let left = access
        .load_table(ConnectionRef::Borrowed(conn.as_mut()), &args.left)
        .context("First query failed")?;
    let right = access
        .load_table(ConnectionRef::Borrowed(conn.as_mut()), &args.right)
        .context("Second query failed")?;

    if are_tables_identical(&left, &right) {
        println!("identical: {} rows, {} columns", left.row_count(), left.column_count());
        return Ok(());
    }
    let (row, column) = first_difference(&left, &right).unwrap_or_default();
    bail!(
        "tables differ at row {}, column {} ({}x{} vs {}x{})",
        row,
        column,
        left.row_count(),
        left.column_count(),
        right.row_count(),
        right.column_count()
    )
}
