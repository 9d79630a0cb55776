use std::str::FromStr;

use csv::{QuoteStyle, Terminator, WriterBuilder};
use listkit_core::{AppError, AppResult};
use listkit_domain::Row;
use serde_json::Value;

/// MIME type of exported files.
pub const CSV_MIME_TYPE: &str = "text/csv;charset=windows-1252;";
/// Declared encoding of exported files.
pub const CSV_ENCODING: &str = "windows-1252";

/// Cell quoting mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CsvQuoting {
    /// Wraps string cells in quotes without escaping embedded quotes.
    ///
    /// Matches files produced by existing clients byte for byte.
    #[default]
    Legacy,
    /// RFC 4180 output: only cells holding a comma, quote or line break are
    /// quoted, and embedded quotes are doubled.
    Rfc4180,
}

impl CsvQuoting {
    /// Returns stable configuration value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Rfc4180 => "rfc4180",
        }
    }
}

impl FromStr for CsvQuoting {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(Self::Legacy),
            "rfc4180" => Ok(Self::Rfc4180),
            _ => Err(AppError::Validation(format!("unknown csv quoting '{value}'"))),
        }
    }
}

/// Finished export ready to be saved or downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    /// Suggested file name.
    pub file_name: String,
    /// CSV text.
    pub content: String,
    /// Number of data rows.
    pub row_count: usize,
}

impl CsvExport {
    /// Returns the MIME type to declare for the file.
    #[must_use]
    pub fn mime_type(&self) -> &'static str {
        CSV_MIME_TYPE
    }

    /// Returns the declared text encoding.
    #[must_use]
    pub fn encoding(&self) -> &'static str {
        CSV_ENCODING
    }
}

/// Renders rows as CSV using the first row's keys as header.
///
/// Later rows are aligned to the header; missing and null cells are empty.
/// An empty input renders as an empty string. Lines are joined with `\n`
/// and the last line has no terminator.
pub fn rows_to_csv(rows: &[Row], quoting: CsvQuoting) -> AppResult<String> {
    let Some(first) = rows.first() else {
        return Ok(String::new());
    };
    let header: Vec<&str> = first.keys().map(String::as_str).collect();

    match quoting {
        CsvQuoting::Legacy => Ok(legacy_csv(&header, rows)),
        CsvQuoting::Rfc4180 => rfc4180_csv(&header, rows),
    }
}

fn legacy_csv(header: &[&str], rows: &[Row]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(header.join(","));
    for row in rows {
        lines.push(
            header
                .iter()
                .map(|key| legacy_cell(row.get(*key)))
                .collect::<Vec<_>>()
                .join(","),
        );
    }

    lines.join("\n")
}

fn legacy_cell(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => format!("\"{text}\""),
        Some(nested @ (Value::Array(_) | Value::Object(_))) => format!("\"{nested}\""),
        other => plain_cell(other),
    }
}

fn rfc4180_csv(header: &[&str], rows: &[Row]) -> AppResult<String> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(header).map_err(csv_error)?;
    for row in rows {
        writer
            .write_record(header.iter().map(|key| plain_cell(row.get(*key))))
            .map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|error| AppError::Internal(format!("failed to flush CSV output: {error}")))?;
    let mut content = String::from_utf8(bytes)
        .map_err(|error| AppError::Internal(format!("CSV output is not UTF-8: {error}")))?;
    if content.ends_with('\n') {
        content.pop();
    }

    Ok(content)
}

fn plain_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

fn csv_error(error: csv::Error) -> AppError {
    AppError::Internal(format!("failed to write CSV record: {error}"))
}

#[cfg(test)]
mod tests {
    use listkit_domain::Row;
    use serde_json::json;

    use super::{CsvQuoting, rows_to_csv};

    fn row(value: serde_json::Value) -> Row {
        serde_json::from_value(value).unwrap_or_default()
    }

    #[test]
    fn strings_are_quoted_and_scalars_are_bare() {
        let rows = vec![
            row(json!({"s_no": 1, "name": "Ann", "active": true, "note": null})),
            row(json!({"s_no": 2, "name": "Bob", "active": false})),
        ];

        assert_eq!(
            rows_to_csv(&rows, CsvQuoting::Legacy).ok().as_deref(),
            Some("s_no,name,active,note\n1,\"Ann\",true,\n2,\"Bob\",false,")
        );
    }

    #[test]
    fn legacy_mode_does_not_escape_embedded_quotes() {
        let rows = vec![row(json!({"title": "say \"hi\""}))];

        assert_eq!(
            rows_to_csv(&rows, CsvQuoting::Legacy).ok().as_deref(),
            Some("title\n\"say \"hi\"\"")
        );
        assert_eq!(
            rows_to_csv(&rows, CsvQuoting::Rfc4180).ok().as_deref(),
            Some("title\n\"say \"\"hi\"\"\"")
        );
    }

    #[test]
    fn later_rows_follow_first_row_columns() {
        let rows = vec![
            row(json!({"a": 1, "b": 2})),
            row(json!({"b": 3, "c": 4})),
        ];
        assert_eq!(
            rows_to_csv(&rows, CsvQuoting::Legacy).ok().as_deref(),
            Some("a,b\n1,2\n,3")
        );
    }

    #[test]
    fn empty_export_is_empty_text() {
        assert_eq!(rows_to_csv(&[], CsvQuoting::Rfc4180).ok().as_deref(), Some(""));
    }

    #[test]
    fn rfc_mode_quotes_only_cells_that_need_it() {
        let rows = vec![
            row(json!({"s_no": 1, "name": "Ann", "city, state": "Austin, TX", "tags": ["a"]})),
            row(json!({"s_no": 2, "name": "line\nbreak", "city, state": null})),
        ];

        assert_eq!(
            rows_to_csv(&rows, CsvQuoting::Rfc4180).ok().as_deref(),
            Some(
                "s_no,name,\"city, state\",tags\n\
                 1,Ann,\"Austin, TX\",\"[\"\"a\"\"]\"\n\
                 2,\"line\nbreak\",,"
            )
        );
    }

    #[test]
    fn quoting_parses_configuration_values() {
        assert_eq!("RFC4180".parse::<CsvQuoting>().ok(), Some(CsvQuoting::Rfc4180));
        assert!("excel".parse::<CsvQuoting>().is_err());
    }
}
