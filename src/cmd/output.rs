//! Output formatting for query results.

use sql_bulkload::table::{ColumnKind, DataTable, Value};
use std::io::Write;

/// Output format for query results
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum OutputFormat {
    /// ASCII table format (default)
    #[default]
    Table,
    /// JSON array format
    Json,
    /// JSON lines format (one object per line)
    JsonLines,
    Csv,
    Tsv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "jsonl" | "jsonlines" | "ndjson" => Ok(OutputFormat::JsonLines),
            "csv" => Ok(OutputFormat::Csv),
            "tsv" => Ok(OutputFormat::Tsv),
            _ => Err(format!(
                "Unknown format: {}. Valid: table, json, jsonl, csv, tsv",
                s
            )),
        }
    }
}

/// Formats a loaded [`DataTable`]
pub struct TableFormatter;

impl TableFormatter {
    pub fn format(table: &DataTable, format: OutputFormat) -> String {
        match format {
            OutputFormat::Table => Self::format_table(table),
            OutputFormat::Json => Self::format_json(table),
            OutputFormat::JsonLines => Self::format_jsonl(table),
            OutputFormat::Csv => Self::format_delimited(table, ','),
            OutputFormat::Tsv => Self::format_delimited(table, '\t'),
        }
    }

    pub fn write<W: Write>(
        table: &DataTable,
        format: OutputFormat,
        writer: &mut W,
    ) -> std::io::Result<()> {
        writer.write_all(Self::format(table, format).as_bytes())
    }

    fn headers(table: &DataTable) -> Vec<String> {
        table.columns().iter().map(|c| c.name.clone()).collect()
    }

    /// Rendered cells, with nulls shown as `NULL`
    fn cells(row: &[Value]) -> Vec<String> {
        row.iter()
            .map(|v| match v {
                Value::Null => "NULL".to_string(),
                other => other.to_string(),
            })
            .collect()
    }

    fn format_table(table: &DataTable) -> String {
        if table.column_count() == 0 {
            return String::new();
        }

        let headers = Self::headers(table);
        let rows: Vec<Vec<String>> = table.rows().iter().map(|r| Self::cells(r)).collect();

        let mut widths: Vec<usize> = headers.iter().map(|c| c.chars().count()).collect();
        for row in &rows {
            for (i, val) in row.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(val.chars().count());
                }
            }
        }

        // Cap widths at 50 chars for readability
        let max_width = 50;
        widths.iter_mut().for_each(|w| *w = (*w).min(max_width));

        let mut output = String::new();
        Self::border(&mut output, &widths, '┌', '┬', '┐');
        Self::line(&mut output, &headers, &widths);
        Self::border(&mut output, &widths, '├', '┼', '┤');
        for row in &rows {
            Self::line(&mut output, row, &widths);
        }
        Self::border(&mut output, &widths, '└', '┴', '┘');

        output.push_str(&format!(
            "{} row{}\n",
            rows.len(),
            if rows.len() == 1 { "" } else { "s" }
        ));
        output
    }

    fn border(output: &mut String, widths: &[usize], left: char, mid: char, right: char) {
        output.push(left);
        for (i, width) in widths.iter().enumerate() {
            output.push_str(&"─".repeat(*width + 2));
            if i < widths.len() - 1 {
                output.push(mid);
            }
        }
        output.push(right);
        output.push('\n');
    }

    fn line(output: &mut String, values: &[String], widths: &[usize]) {
        output.push('│');
        for (val, width) in values.iter().zip(widths) {
            let truncated = Self::truncate(val, *width);
            output.push_str(&format!(" {:width$} │", truncated, width = *width));
        }
        output.push('\n');
    }

    /// Truncate to `max_len` characters
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
            format!("{}…", kept)
        }
    }

    fn json_object(table: &DataTable, row: &[Value]) -> serde_json::Value {
        let obj: serde_json::Map<String, serde_json::Value> = table
            .columns()
            .iter()
            .zip(row)
            .map(|(col, val)| (col.name.clone(), Self::json_value(col.kind, val)))
            .collect();
        serde_json::Value::Object(obj)
    }

    fn format_json(table: &DataTable) -> String {
        let rows: Vec<serde_json::Value> = table
            .rows()
            .iter()
            .map(|row| Self::json_object(table, row))
            .collect();
        serde_json::to_string_pretty(&rows).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_jsonl(table: &DataTable) -> String {
        let mut output = String::new();
        for row in table.rows() {
            output.push_str(
                &serde_json::to_string(&Self::json_object(table, row))
                    .unwrap_or_else(|_| "{}".to_string()),
            );
            output.push('\n');
        }
        output
    }

    fn json_value(kind: ColumnKind, val: &Value) -> serde_json::Value {
        match val {
            Value::Null => serde_json::Value::Null,
            Value::Integer(n) => serde_json::Value::Number((*n).into()),
            Value::Float(x) => serde_json::Number::from_f64(*x)
                .map_or_else(|| serde_json::Value::String(x.to_string()), serde_json::Value::Number),
            Value::Text(s) if kind.is_numeric() => s
                .parse::<i64>()
                .map(|n| serde_json::Value::Number(n.into()))
                .unwrap_or_else(|_| serde_json::Value::String(s.clone())),
            other => serde_json::Value::String(other.to_string()),
        }
    }

    fn format_delimited(table: &DataTable, delimiter: char) -> String {
        let mut output = String::new();
        output.push_str(&Self::delimited_row(&Self::headers(table), delimiter));
        output.push('\n');
        for row in table.rows() {
            // Nulls are empty fields here
            let values: Vec<String> = row.iter().map(Value::to_string).collect();
            output.push_str(&Self::delimited_row(&values, delimiter));
            output.push('\n');
        }
        output
    }

    fn delimited_row(values: &[String], delimiter: char) -> String {
        values
            .iter()
            .map(|v| Self::escape(v, delimiter))
            .collect::<Vec<_>>()
            .join(&delimiter.to_string())
    }

    fn escape(val: &str, delimiter: char) -> String {
        if val.contains(delimiter) || val.contains('"') || val.contains('\n') || val.contains('\r')
        {
            format!("\"{}\"", val.replace('"', "\"\""))
        } else {
            val.to_string()
        }
    }
}
