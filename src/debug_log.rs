//! Append-only record of executed statements.
//!
//! Enabled by `debug_mode`. This is an audit trail for the caller and is kept
//! separate from `tracing` output; nothing reads it back to make decisions.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct DebugLog {
    enabled: bool,
    entries: Vec<String>,
}

impl DebugLog {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            entries: Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Append one executed statement. No-op when disabled.
    pub fn record(&mut self, sql: &str) {
        if self.enabled {
            self.entries.push(sql.to_string());
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Move every entry of `other` onto the end of this log
    pub fn append(&mut self, other: DebugLog) {
        if self.enabled {
            self.entries.extend(other.entries);
        }
    }

    /// Write the log as a SQL script, one statement block per entry
    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        for entry in &self.entries {
            writeln!(writer, "{}", entry.trim_end())?;
            writeln!(writer)?;
        }
        writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_disabled_log_records_nothing() {
        let mut log = DebugLog::new(false);
        log.record("select 1");
        assert!(log.is_empty());
    }

    #[test]
    fn test_write_to_file() {
        let mut log = DebugLog::new(true);
        log.record("create table t (a integer NULL)");
        log.record("insert into t (a) values (1);\n");
        assert_eq!(log.len(), 2);

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("debug.sql");
        log.write_to(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "create table t (a integer NULL)\n\ninsert into t (a) values (1);\n\n"
        );
    }
}
