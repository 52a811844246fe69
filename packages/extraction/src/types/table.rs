//! Tabular extraction result and its persisted forms.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ExtractionError, Result};
use crate::types::schema::{FieldSpec, LISTINGS_KEY};

/// Rows of string values under exactly the requested columns.
///
/// Built fresh by each run; rows are only appended by the merger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl ExtractionTable {
    /// An empty table with the given headers.
    pub fn empty(fields: &FieldSpec) -> Self {
        Self {
            columns: fields.to_vec(),
            rows: Vec::new(),
        }
    }

    pub(crate) fn push_row(&mut self, row: Vec<String>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at `row` under `column`.
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row).map(|r| r[col].as_str())
    }

    /// All values of one column, top to bottom.
    pub fn column(&self, column: &str) -> Option<Vec<&str>> {
        let col = self.columns.iter().position(|c| c == column)?;
        Some(self.rows.iter().map(|r| r[col].as_str()).collect())
    }

    /// Rows as ordered JSON objects.
    pub fn records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned().map(Value::String))
                    .collect()
            })
            .collect()
    }

    /// `{"listings": [...]}`, keys in column order.
    pub fn to_json(&self) -> Value {
        let records: Vec<Value> = self.records().into_iter().map(Value::Object).collect();
        let mut root = Map::new();
        root.insert(LISTINGS_KEY.to_string(), Value::Array(records));
        Value::Object(root)
    }

    /// Write CSV with a header row. Values are written verbatim; quoting is
    /// left to the CSV writer.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(&self.columns).map_err(export_error)?;
        for row in &self.rows {
            csv_writer.write_record(row).map_err(export_error)?;
        }
        csv_writer.flush().map_err(export_error)?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        String::from_utf8(buffer).map_err(export_error)
    }

    pub fn save_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path.as_ref()).map_err(export_error)?;
        self.write_csv(file)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path.as_ref()).map_err(export_error)?;
        serde_json::to_writer_pretty(file, &self.to_json()).map_err(export_error)
    }

    /// Save as `extracted_data_<YYYYMMDD_HHMMSS>.csv` under `dir`, creating it if missing.
    pub fn save_timestamped_csv(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(export_error)?;
        let path = dir.join(timestamped_file_name(Local::now(), "csv"));
        self.save_csv(&path)?;
        Ok(path)
    }
}

/// `extracted_data_<YYYYMMDD_HHMMSS>.<extension>`
pub fn timestamped_file_name(at: DateTime<Local>, extension: &str) -> String {
    format!("extracted_data_{}.{}", at.format("%Y%m%d_%H%M%S"), extension)
}

fn export_error(e: impl std::error::Error + Send + Sync + 'static) -> ExtractionError {
    ExtractionError::Export(Box::new(e))
}

/// Plain-text grid with a leading `Index` column.
impl fmt::Display for ExtractionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let index_header = "Index";
        let index_width = index_header
            .len()
            .max(self.rows.len().saturating_sub(1).to_string().len());

        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                self.rows
                    .iter()
                    .map(|r| r[i].chars().count())
                    .chain(std::iter::once(c.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        write!(f, "{:<index_width$}", index_header)?;
        for (column, width) in self.columns.iter().zip(&widths) {
            write!(f, "  {:<width$}", column, width = *width)?;
        }
        writeln!(f)?;

        for (i, row) in self.rows.iter().enumerate() {
            write!(f, "{:<index_width$}", i)?;
            for (value, width) in row.iter().zip(&widths) {
                write!(f, "  {:<width$}", value, width = *width)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> ExtractionTable {
        let fields = FieldSpec::new(["name", "price"]).unwrap();
        let mut table = ExtractionTable::empty(&fields);
        table.push_row(vec!["Desk, oak".to_string(), "120".to_string()]);
        table.push_row(vec!["Lamp \"Arc\"".to_string(), String::new()]);
        table
    }

    #[test]
    fn test_empty_table_keeps_headers() {
        let fields = FieldSpec::new(["a", "b"]).unwrap();
        let table = ExtractionTable::empty(&fields);
        assert!(table.is_empty());
        assert_eq!(table.columns(), &["a".to_string(), "b".to_string()]);
        assert_eq!(table.to_csv_string().unwrap(), "a,b\n");
    }

    #[test]
    fn test_csv_header_follows_field_order_and_values_are_verbatim() {
        let csv = sample().to_csv_string().unwrap();
        let mut reader = csv::Reader::from_reader(csv.as_bytes());

        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, vec!["name", "price"]);

        let rows: Vec<Vec<String>> = reader
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect();
        assert_eq!(rows[0], vec!["Desk, oak", "120"]);
        assert_eq!(rows[1], vec!["Lamp \"Arc\"", ""]);
    }

    #[test]
    fn test_to_json_keeps_column_order() {
        let json = sample().to_json();
        let first = json["listings"][0].as_object().unwrap();
        let keys: Vec<&String> = first.keys().collect();
        assert_eq!(keys, vec!["name", "price"]);
        assert_eq!(json["listings"][1]["price"], "");
    }

    #[test]
    fn test_cell_and_column_access() {
        let table = sample();
        assert_eq!(table.get(0, "price"), Some("120"));
        assert_eq!(table.get(5, "price"), None);
        assert_eq!(table.get(0, "missing"), None);
        assert_eq!(table.column("name").unwrap(), vec!["Desk, oak", "Lamp \"Arc\""]);
    }

    #[test]
    fn test_timestamped_file_name() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            timestamped_file_name(at, "csv"),
            "extracted_data_20240309_140507.csv"
        );
    }

    #[test]
    fn test_save_timestamped_csv_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("output");

        let path = sample().save_timestamped_csv(&dir).unwrap();

        assert!(path.starts_with(&dir));
        let written = std::fs::read_to_string(path).unwrap();
        assert!(written.starts_with("name,price\n"));
    }

    #[test]
    fn test_display_has_index_column() {
        let rendered = sample().to_string();
        let mut lines = rendered.lines();
        assert!(lines.next().unwrap().starts_with("Index  name"));
        assert!(lines.next().unwrap().starts_with("0      Desk, oak"));
    }
}
