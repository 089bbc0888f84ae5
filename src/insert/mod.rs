//! Batched, transactional inserts.
//!
//! Every insert runs inside one transaction on the caller's connection:
//!
//! 1. begin
//! 2. optionally delete every existing row
//! 3. render rows and flush a statement each time the running row count
//!    reaches a multiple of `insert_burst_size`, then flush the remainder
//! 4. commit, or roll back on the first failure
//!
//! Rows are either one multi-row `insert ... values (..),\n(..)` statement per
//! batch or one `insert ... values (..);` statement per row, concatenated.

use crate::access::Connection;
use crate::config::LoadConfig;
use crate::debug_log::DebugLog;
use crate::error::{LoadError, Result};
use crate::sqlgen::{SqlGenerator, SqlHooks};
use crate::table::DataTable;
use indicatif::ProgressBar;
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// Outcome of one insert call
#[derive(Debug, Default, Clone, PartialEq)]
pub struct InsertStats {
    pub rows_inserted: u64,
    pub statements_executed: usize,
    pub duration_secs: f64,
}

impl fmt::Display for InsertStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows inserted with {} statements in {:.2}s",
            self.rows_inserted, self.statements_executed, self.duration_secs
        )
    }
}

pub struct BulkInserter<'a> {
    generator: SqlGenerator<'a>,
    config: &'a LoadConfig,
    progress: Option<ProgressBar>,
    debug_log: DebugLog,
}

impl<'a> BulkInserter<'a> {
    /// Inserter for the dialect of `conn`
    pub fn new(conn: &dyn Connection, config: &'a LoadConfig) -> Self {
        Self::with_generator(SqlGenerator::new(conn.dialect(), config), config)
    }

    pub fn with_generator(generator: SqlGenerator<'a>, config: &'a LoadConfig) -> Self {
        Self {
            generator,
            config,
            progress: None,
            debug_log: DebugLog::new(config.debug_mode),
        }
    }

    pub fn with_hooks(mut self, hooks: &'a dyn SqlHooks) -> Self {
        self.generator = self.generator.with_hooks(hooks);
        self
    }

    /// Advance `progress` by the number of rows in every flushed batch
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn generator(&self) -> &SqlGenerator<'a> {
        &self.generator
    }

    pub fn debug_log(&self) -> &DebugLog {
        &self.debug_log
    }

    pub fn into_debug_log(self) -> DebugLog {
        self.debug_log
    }

    /// Drop the table, ignoring failure, then create it from `table`'s schema
    pub fn create_table(&mut self, conn: &mut dyn Connection, table: &DataTable) -> Result<()> {
        let name = self.generator.database_name(table.name());
        let drop_sql = format!("drop table {}", name);
        self.debug_log.record(&drop_sql);
        if let Err(e) = conn.execute(&drop_sql) {
            debug!(table = %name, "drop before create failed: {}", e);
        }

        let create_sql = self.generator.table_create_sql(table);
        self.debug_log.record(&create_sql);
        debug!(sql = %create_sql, "creating table");
        conn.execute(&create_sql)
            .map_err(|e| LoadError::execute(&create_sql, e))
    }

    /// Insert every row of a typed table
    pub fn insert_table(
        &mut self,
        conn: &mut dyn Connection,
        table: &DataTable,
        delete_first: bool,
    ) -> Result<InsertStats> {
        let table_name = self.generator.database_name(table.name());
        let template = self.template(&table_name, &self.generator.column_names_sql(table));
        let generator = &self.generator;
        let rows = table
            .rows()
            .iter()
            .map(move |row| generator.row_values_sql(table, row));
        let mut batches = Batches::new(&self.generator, &template);
        let progress = self.progress.as_ref();
        let result = run_in_transaction(
            conn,
            &table_name,
            delete_first,
            &mut self.debug_log,
            |conn, log| batches.feed(conn, rows, log, progress),
        );
        self.finish(result, &table_name)
    }

    /// Insert rows whose values are already rendered SQL literals.
    ///
    /// Column names still go through identifier sanitization and quoting.
    pub fn raw_insert_table<C, R, V>(
        &mut self,
        conn: &mut dyn Connection,
        table_name: &str,
        columns: &[C],
        rows: &[R],
        delete_first: bool,
    ) -> Result<InsertStats>
    where
        C: AsRef<str>,
        R: AsRef<[V]>,
        V: AsRef<str>,
    {
        let table_name = self.generator.database_name(table_name);
        let column_names = columns
            .iter()
            .map(|c| self.generator.database_name(c.as_ref()))
            .collect::<Vec<_>>()
            .join(",");
        let template = self.template(&table_name, &column_names);
        let rows = rows.iter().map(|row| {
            row.as_ref()
                .iter()
                .map(|v| v.as_ref())
                .collect::<Vec<_>>()
                .join(",")
        });
        let mut batches = Batches::new(&self.generator, &template);
        let progress = self.progress.as_ref();
        let result = run_in_transaction(
            conn,
            &table_name,
            delete_first,
            &mut self.debug_log,
            |conn, log| batches.feed(conn, rows, log, progress),
        );
        self.finish(result, &table_name)
    }

    /// Optionally create the table, then insert all of its rows
    pub fn load_table_to_database(
        &mut self,
        conn: &mut dyn Connection,
        table: &DataTable,
        create: bool,
        delete_first: bool,
    ) -> Result<InsertStats> {
        if create {
            self.create_table(conn, table)?;
        }
        self.insert_table(conn, table, delete_first)
    }

    fn template(&self, table_name: &str, column_names: &str) -> String {
        let hints = self.config.insert_table_hints.trim();
        if hints.is_empty() {
            format!("insert into {} ({}) values", table_name, column_names)
        } else {
            format!("insert into {} {} ({}) values", table_name, hints, column_names)
        }
    }

    fn finish(&self, result: Result<InsertStats>, table_name: &str) -> Result<InsertStats> {
        let stats = result?;
        info!(table = %table_name, "{}", stats);
        Ok(stats)
    }
}

/// Wraps `body` in begin/commit, rolling back when it fails
fn run_in_transaction(
    conn: &mut dyn Connection,
    table_name: &str,
    delete_first: bool,
    log: &mut DebugLog,
    body: impl FnOnce(&mut dyn Connection, &mut DebugLog) -> Result<InsertStats>,
) -> Result<InsertStats> {
    let start = Instant::now();
    conn.begin()?;

    let outcome =
        delete_rows(conn, table_name, delete_first, log).and_then(|()| body(conn, log));

    match outcome {
        Ok(mut stats) => {
            conn.commit()
                .map_err(|e| LoadError::execute("COMMIT", e))?;
            stats.duration_secs = start.elapsed().as_secs_f64();
            Ok(stats)
        }
        Err(e) => {
            warn!(table = %table_name, "insert failed, rolling back");
            if let Err(rollback) = conn.rollback() {
                warn!(table = %table_name, "rollback failed: {}", rollback);
            }
            Err(e)
        }
    }
}

fn delete_rows(
    conn: &mut dyn Connection,
    table_name: &str,
    delete_first: bool,
    log: &mut DebugLog,
) -> Result<()> {
    if !delete_first {
        return Ok(());
    }
    let sql = format!("delete from {}", table_name);
    log.record(&sql);
    debug!(sql = %sql, "clearing table");
    conn.execute(&sql).map_err(|e| LoadError::execute(&sql, e))
}

/// Accumulates rendered rows into statements of `burst` rows
struct Batches<'t> {
    generator: &'t SqlGenerator<'t>,
    template: &'t str,
    burst: usize,
    multi_row: bool,
    buffer: String,
    pending: usize,
}

impl<'t> Batches<'t> {
    fn new(generator: &'t SqlGenerator<'t>, template: &'t str) -> Self {
        let config = generator.config();
        Self {
            generator,
            template,
            burst: config.insert_burst_size.max(1),
            multi_row: config.use_multi_rows_insert,
            buffer: String::new(),
            pending: 0,
        }
    }

    fn feed(
        &mut self,
        conn: &mut dyn Connection,
        rows: impl Iterator<Item = String>,
        log: &mut DebugLog,
        progress: Option<&ProgressBar>,
    ) -> Result<InsertStats> {
        conn.set_timeout(self.generator.config().execute_timeout())?;
        let mut stats = InsertStats::default();
        for (i, row) in rows.enumerate() {
            self.push(&row);
            if (i + 1) % self.burst == 0 {
                self.flush(conn, log, progress, &mut stats)?;
            }
        }
        if self.pending > 0 {
            self.flush(conn, log, progress, &mut stats)?;
        }
        Ok(stats)
    }

    fn push(&mut self, row: &str) {
        if self.multi_row {
            if self.pending == 0 {
                self.buffer.push_str(self.template);
                self.buffer.push('\n');
            } else {
                self.buffer.push_str(",\n");
            }
            self.buffer.push('(');
            self.buffer.push_str(row);
            self.buffer.push(')');
        } else {
            self.buffer.push_str(self.template);
            self.buffer.push_str(" (");
            self.buffer.push_str(row);
            self.buffer.push_str(");\n");
        }
        self.pending += 1;
    }

    fn flush(
        &mut self,
        conn: &mut dyn Connection,
        log: &mut DebugLog,
        progress: Option<&ProgressBar>,
        stats: &mut InsertStats,
    ) -> Result<()> {
        let sql = self.generator.insert_command(&self.buffer);
        log.record(&sql);
        trace!(rows = self.pending, "flushing insert batch");
        conn.execute(&sql).map_err(|e| LoadError::execute(&sql, e))?;

        stats.rows_inserted += self.pending as u64;
        stats.statements_executed += 1;
        if let Some(pb) = progress {
            pb.inc(self.pending as u64);
        }
        self.buffer.clear();
        self.pending = 0;
        Ok(())
    }
}
