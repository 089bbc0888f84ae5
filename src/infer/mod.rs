//! Column type inference for loosely-typed text data.
//!
//! Each text column is tried against integer, then floating-point, then
//! timestamp. A candidate type is taken only when every non-empty value in the
//! column parses as that type; one failure disqualifies it. Columns with no
//! non-empty values stay text. Values are then re-parsed into the chosen type,
//! and anything that still fails to parse becomes null.

use crate::config::LoadConfig;
use crate::table::{Column, ColumnKind, DataTable, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::debug;

/// Candidate types, strongest first
const CANDIDATES: [ColumnKind; 3] = [
    ColumnKind::Integer,
    ColumnKind::Float,
    ColumnKind::Timestamp,
];

/// Replaceable inference strategy
pub trait TypeDetector {
    fn detect_and_convert(&self, table: &DataTable, config: &LoadConfig) -> DataTable;
}

/// Built-in inference
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultTypeDetector;

impl TypeDetector for DefaultTypeDetector {
    fn detect_and_convert(&self, table: &DataTable, config: &LoadConfig) -> DataTable {
        TypeInference::new(&config.date_formats).convert(table)
    }
}

/// Infer column types and convert values using the configured date formats
pub fn detect_and_convert_types(table: &DataTable, config: &LoadConfig) -> DataTable {
    DefaultTypeDetector.detect_and_convert(table, config)
}

pub struct TypeInference<'a> {
    date_formats: &'a [String],
}

impl<'a> TypeInference<'a> {
    pub fn new(date_formats: &'a [String]) -> Self {
        Self { date_formats }
    }

    /// Classify one column. Already-typed columns keep their kind.
    pub fn classify_column(&self, table: &DataTable, index: usize) -> ColumnKind {
        let Some(column) = table.column(index) else {
            return ColumnKind::Text;
        };
        if column.kind != ColumnKind::Text {
            return column.kind;
        }

        for candidate in CANDIDATES {
            let mut seen = 0usize;
            let all_parse = table
                .column_values(index)
                .filter_map(candidate_text)
                .all(|text| {
                    seen += 1;
                    self.parses_as(candidate, &text)
                });
            if all_parse && seen > 0 {
                return candidate;
            }
        }
        ColumnKind::Text
    }

    /// Produce a new table with inferred column kinds and converted values
    pub fn convert(&self, table: &DataTable) -> DataTable {
        let kinds: Vec<ColumnKind> = (0..table.column_count())
            .map(|i| self.classify_column(table, i))
            .collect();

        let columns = table
            .columns()
            .iter()
            .zip(&kinds)
            .map(|(source, &kind)| Column {
                kind,
                ..source.clone()
            })
            .collect();
        let mut result = DataTable::with_columns(table.name(), columns);

        for row in table.rows() {
            let converted = row
                .iter()
                .zip(table.columns().iter().zip(&kinds))
                .map(|(value, (source, &kind))| {
                    if source.kind == kind {
                        value.clone()
                    } else {
                        self.convert_value(kind, value)
                    }
                })
                .collect();
            // Same width as the source row, which already matched its columns
            if let Err(e) = result.push_row(converted) {
                debug!("dropping malformed row during inference: {}", e);
            }
        }

        for (column, kind) in result.columns().iter().zip(&kinds) {
            debug!(table = %table.name(), column = %column.name, kind = %kind, "inferred column type");
        }
        result
    }

    /// Re-parse a text value into `kind`. Unparseable values become null.
    pub fn convert_value(&self, kind: ColumnKind, value: &Value) -> Value {
        if value.is_null() {
            return Value::Null;
        }
        let text = value.to_string();
        match kind {
            ColumnKind::Integer => parse_integer(&text).map_or(Value::Null, Value::Integer),
            ColumnKind::Float => parse_float(&text).map_or(Value::Null, Value::Float),
            ColumnKind::Timestamp => {
                parse_timestamp(&text, self.date_formats).map_or(Value::Null, Value::Timestamp)
            }
            ColumnKind::Text => Value::Text(text),
        }
    }

    fn parses_as(&self, kind: ColumnKind, text: &str) -> bool {
        match kind {
            ColumnKind::Integer => parse_integer(text).is_some(),
            ColumnKind::Float => parse_float(text).is_some(),
            ColumnKind::Timestamp => parse_timestamp(text, self.date_formats).is_some(),
            ColumnKind::Text => true,
        }
    }
}

/// Text of a value that takes part in classification (non-null, non-empty)
fn candidate_text(value: &Value) -> Option<String> {
    if value.is_null() {
        return None;
    }
    let text = value.to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Parse a whole number, allowing surrounding whitespace and a sign
pub fn parse_integer(text: &str) -> Option<i64> {
    text.trim().parse::<i64>().ok()
}

/// Parse a floating-point number.
///
/// `.` is always accepted as the decimal separator. A single `,` with no `.`
/// is read as a locale decimal comma. Non-finite values are rejected.
pub fn parse_float(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let lower = trimmed.to_ascii_lowercase();
    if lower.contains("inf") || lower.contains("nan") {
        return None;
    }
    let parsed = trimmed.parse::<f64>().ok().or_else(|| {
        if trimmed.matches(',').count() == 1 && !trimmed.contains('.') {
            trimmed.replace(',', ".").parse::<f64>().ok()
        } else {
            None
        }
    })?;
    parsed.is_finite().then_some(parsed)
}

/// Parse a timestamp using the given chrono formats, then RFC 3339.
///
/// Date-only formats yield midnight.
pub fn parse_timestamp<S: AsRef<str>>(text: &str, formats: &[S]) -> Option<NaiveDateTime> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    for format in formats {
        let format = format.as_ref();
        if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(ts);
        }
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.naive_local())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_DATE_FORMATS;

    fn text_table(values: &[Option<&str>]) -> DataTable {
        DataTable::from_text_rows(
            "t",
            &["c"],
            values
                .iter()
                .map(|v| vec![v.map(|s| s.to_string())])
                .collect(),
        )
        .unwrap()
    }

    fn classify(values: &[Option<&str>]) -> ColumnKind {
        let formats: Vec<String> = DEFAULT_DATE_FORMATS.iter().map(|s| s.to_string()).collect();
        TypeInference::new(&formats).classify_column(&text_table(values), 0)
    }

    #[test]
    fn test_integer_column() {
        assert_eq!(
            classify(&[Some("1"), Some("-2"), None, Some(" 30 ")]),
            ColumnKind::Integer
        );
    }

    #[test]
    fn test_precedence_fallback_chain() {
        assert_eq!(classify(&[Some("1"), Some("2.5")]), ColumnKind::Float);
        assert_eq!(
            classify(&[Some("2024-01-01"), Some("2024-02-03 10:00:00")]),
            ColumnKind::Timestamp
        );
        assert_eq!(classify(&[Some("1"), Some("abc")]), ColumnKind::Text);
    }

    #[test]
    fn test_no_values_stays_text() {
        assert_eq!(classify(&[None, Some(""), None]), ColumnKind::Text);
        assert_eq!(classify(&[]), ColumnKind::Text);
    }

    #[test]
    fn test_overflow_falls_to_float() {
        assert_eq!(
            classify(&[Some("99999999999999999999")]),
            ColumnKind::Float
        );
    }

    #[test]
    fn test_parse_float_decimal_comma() {
        assert_eq!(parse_float("3,5"), Some(3.5));
        assert_eq!(parse_float("3.25"), Some(3.25));
        assert_eq!(parse_float("1,000.5"), None);
        assert_eq!(parse_float("NaN"), None);
        assert_eq!(parse_float("inf"), None);
    }

    #[test]
    fn test_parse_timestamp_date_only_is_midnight() {
        let ts = parse_timestamp("2024-03-04", DEFAULT_DATE_FORMATS).unwrap();
        assert_eq!(ts.to_string(), "2024-03-04 00:00:00");
        let ts = parse_timestamp("03/04/2024 13:05:06", DEFAULT_DATE_FORMATS).unwrap();
        assert_eq!(ts.to_string(), "2024-03-04 13:05:06");
        assert!(parse_timestamp("not a date", DEFAULT_DATE_FORMATS).is_none());
    }

    #[test]
    fn test_convert_empty_text_becomes_null() {
        let table = text_table(&[Some("1"), Some(""), None]);
        let converted = detect_and_convert_types(&table, &LoadConfig::default());
        assert_eq!(converted.columns()[0].kind, ColumnKind::Integer);
        assert_eq!(
            converted.column_values(0).cloned().collect::<Vec<_>>(),
            vec![Value::Integer(1), Value::Null, Value::Null]
        );
    }

    #[test]
    fn test_inference_is_idempotent() {
        let table = DataTable::from_text_rows(
            "t",
            &["i", "f", "ts", "empty", "name"],
            vec![
                vec![
                    Some("1".into()),
                    Some("1.5".into()),
                    Some("2024-01-01".into()),
                    Some("".into()),
                    Some("a".into()),
                ],
                vec![
                    Some("2".into()),
                    Some("3".into()),
                    Some("2024-01-02 10:30:00".into()),
                    None,
                    Some("b".into()),
                ],
            ],
        )
        .unwrap();
        let config = LoadConfig::default();
        let once = detect_and_convert_types(&table, &config);
        let twice = detect_and_convert_types(&once, &config);

        let kinds: Vec<ColumnKind> = once.columns().iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ColumnKind::Integer,
                ColumnKind::Float,
                ColumnKind::Timestamp,
                ColumnKind::Text,
                ColumnKind::Text
            ]
        );
        assert_eq!(twice.columns()[3].kind, ColumnKind::Text);
        assert_eq!(once, twice);
    }
}
