//! Flat tabular results and delimited/JSON output.
//!
//! Every harvester produces a [`Table`]: an ordered set of named columns
//! and rows of string cells. Columns appear in first-seen order; cells a
//! row does not set render empty. The writers cover CSV (any delimiter)
//! and JSON (array of objects).

use chrono::Local;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur when reading or writing tables.
#[derive(Error, Debug)]
pub enum TableError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("column '{0}' not found")]
    MissingColumn(String),
}

/// An ordered-column table of string cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty table with a fixed initial column order.
    #[must_use]
    pub fn with_columns(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(ToString::to_string).collect(),
            rows: Vec::new(),
        }
    }

    /// Column names in order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The cell at `(row, column)`, if both exist.
    #[must_use]
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    fn column_index(&mut self, name: &str) -> usize {
        if let Some(index) = self.columns.iter().position(|c| c == name) {
            return index;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(String::new());
        }
        self.columns.len() - 1
    }

    /// Append a row given `(column, value)` cells. Unknown columns are
    /// appended to the column list in first-seen order.
    pub fn push_row<'a, I>(&mut self, cells: I)
    where
        I: IntoIterator<Item = (&'a str, String)>,
    {
        let mut row = vec![String::new(); self.columns.len()];
        for (name, value) in cells {
            let index = self.column_index(name);
            if index >= row.len() {
                row.resize(self.columns.len(), String::new());
            }
            row[index] = value;
        }
        row.resize(self.columns.len(), String::new());
        self.rows.push(row);
    }

    /// Keep only the listed columns that actually exist, in the listed
    /// order. Columns not listed are dropped.
    pub fn reorder(&mut self, preferred: &[&str]) {
        let keep: Vec<usize> = preferred
            .iter()
            .filter_map(|name| self.columns.iter().position(|c| c == name))
            .collect();
        self.columns = keep.iter().map(|&i| self.columns[i].clone()).collect();
        for row in &mut self.rows {
            *row = keep.iter().map(|&i| row[i].clone()).collect();
        }
    }

    /// Append all rows of `other`, aligning columns by name.
    pub fn concat(&mut self, other: &Table) {
        let indices: Vec<usize> = other
            .columns
            .iter()
            .map(|name| self.column_index(name))
            .collect();
        for row in &other.rows {
            let mut merged = vec![String::new(); self.columns.len()];
            for (&index, cell) in indices.iter().zip(row) {
                merged[index] = cell.clone();
            }
            self.rows.push(merged);
        }
    }

    /// Read a table from a delimited file with a header row.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_csv_path(path: &Path, delimiter: u8) -> Result<Self, TableError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_path(path)?;
        let columns: Vec<String> = reader
            .headers()?
            .iter()
            .map(ToString::to_string)
            .collect();
        let mut table = Self {
            columns,
            rows: Vec::new(),
        };
        for record in reader.records() {
            let record = record?;
            let mut row: Vec<String> = record.iter().map(ToString::to_string).collect();
            row.resize(table.columns.len(), String::new());
            row.truncate(table.columns.len());
            table.rows.push(row);
        }
        Ok(table)
    }

    /// Write the table as delimited text with a header row.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_csv<W: Write>(&self, writer: W, delimiter: u8) -> Result<(), TableError> {
        let mut out = csv::WriterBuilder::new().delimiter(delimiter).from_writer(writer);
        out.write_record(&self.columns)?;
        for row in &self.rows {
            out.write_record(row)?;
        }
        out.flush()?;
        Ok(())
    }

    /// Write the table as a JSON array of objects.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_json<W: Write>(&self, writer: W) -> Result<(), TableError> {
        let rows: Vec<Value> = self
            .rows
            .iter()
            .map(|row| {
                let mut object = Map::new();
                for (column, cell) in self.columns.iter().zip(row) {
                    object.insert(column.clone(), Value::String(cell.clone()));
                }
                Value::Object(object)
            })
            .collect();
        serde_json::to_writer_pretty(writer, &rows)?;
        Ok(())
    }

    /// Write the table to `path` as comma-delimited CSV.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn to_csv_path(&self, path: &Path) -> Result<(), TableError> {
        self.write_csv(File::create(path)?, b',')
    }

    /// Write the table to `path` as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn to_json_path(&self, path: &Path) -> Result<(), TableError> {
        self.write_json(File::create(path)?)
    }
}

/// Build a timestamped output file name, `{stem}_{YYYYMMDD_HHMMSS}.{ext}`.
#[must_use]
pub fn timestamped_path(stem: &str, extension: &str) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    PathBuf::from(format!("{stem}_{timestamp}.{extension}"))
}

/// Render an observation value for tabular output: integral values print
/// without a trailing `.0`.
#[must_use]
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Normalize every row of a delimited file to exactly `expected` columns.
///
/// Empty cells are dropped (shifting data left) before padding short rows
/// with empty cells on the right or truncating long ones.
///
/// # Errors
///
/// Returns an error if the input cannot be read or the output written.
pub fn validate_columns(
    input: &Path,
    output: &Path,
    expected: usize,
    delimiter: u8,
) -> Result<usize, TableError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .has_headers(false)
        .from_path(input)?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(output)?;

    let mut written = 0;
    for record in reader.records() {
        let record = record?;
        let mut row: Vec<String> = record
            .iter()
            .filter(|cell| !cell.is_empty())
            .map(ToString::to_string)
            .collect();
        row.resize(expected, String::new());
        writer.write_record(&row)?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

/// Keep the rows of `table` whose numeric id in `id_column` appears in
/// `reference`'s `reference_column`. Rows with non-numeric ids on either
/// side are dropped before matching.
///
/// # Errors
///
/// Returns an error if either column is missing.
pub fn cross_reference(
    table: &Table,
    id_column: &str,
    reference: &Table,
    reference_column: &str,
) -> Result<Table, TableError> {
    let id_index = table
        .columns
        .iter()
        .position(|c| c == id_column)
        .ok_or_else(|| TableError::MissingColumn(id_column.to_string()))?;
    if !reference.columns.iter().any(|c| c == reference_column) {
        return Err(TableError::MissingColumn(reference_column.to_string()));
    }

    let known: HashSet<i64> = reference
        .rows
        .iter()
        .enumerate()
        .filter_map(|(row, _)| reference.get(row, reference_column))
        .filter_map(|cell| cell.trim().parse::<i64>().ok())
        .collect();

    let rows = table
        .rows
        .iter()
        .filter(|row| {
            row.get(id_index)
                .and_then(|cell| cell.trim().parse::<i64>().ok())
                .is_some_and(|id| known.contains(&id))
        })
        .cloned()
        .collect();

    Ok(Table {
        columns: table.columns.clone(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Table {
        let mut table = Table::new();
        table.push_row([("geo", "A".to_string()), ("value", "1".to_string())]);
        table.push_row([
            ("geo", "B".to_string()),
            ("value", "2".to_string()),
            ("unit", "MIO_M3".to_string()),
        ]);
        table
    }

    #[test]
    fn test_push_row_appends_columns_in_first_seen_order() {
        let table = sample();
        assert_eq!(table.columns(), &["geo", "value", "unit"]);
        assert_eq!(table.get(0, "unit"), Some(""));
        assert_eq!(table.get(1, "unit"), Some("MIO_M3"));
    }

    #[test]
    fn test_reorder_keeps_only_existing_listed_columns() {
        let mut table = sample();
        table.reorder(&["unit", "geo", "nonexistent"]);
        assert_eq!(table.columns(), &["unit", "geo"]);
        assert_eq!(table.get(1, "unit"), Some("MIO_M3"));
        assert_eq!(table.get(0, "geo"), Some("A"));
        assert_eq!(table.get(0, "value"), None);
    }

    #[test]
    fn test_concat_aligns_by_column_name() {
        let mut first = sample();
        let mut second = Table::new();
        second.push_row([("value", "9".to_string()), ("geo", "C".to_string())]);
        first.concat(&second);
        assert_eq!(first.len(), 3);
        assert_eq!(first.get(2, "geo"), Some("C"));
        assert_eq!(first.get(2, "value"), Some("9"));
        assert_eq!(first.get(2, "unit"), Some(""));
    }

    #[test]
    fn test_csv_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let table = sample();
        table.to_csv_path(&path).unwrap();
        let read = Table::from_csv_path(&path, b',').unwrap();
        assert_eq!(read, table);
    }

    #[test]
    fn test_write_json_objects() {
        let mut buffer = Vec::new();
        sample().write_json(&mut buffer).unwrap();
        let parsed: Vec<serde_json::Value> = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1]["unit"], "MIO_M3");
        assert_eq!(parsed[0]["unit"], "");
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(4.0), "4");
        assert_eq!(format_value(-12.0), "-12");
        assert_eq!(format_value(3.25), "3.25");
    }

    #[test]
    fn test_timestamped_path_shape() {
        let path = timestamped_path("eurostat_env_wat", "csv");
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("eurostat_env_wat_"));
        assert!(name.ends_with(".csv"));
    }

    #[test]
    fn test_validate_columns_pads_and_truncates() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.csv");
        let output = dir.path().join("out.csv");
        std::fs::write(&input, "a|b\nc||d|e|f\ng\n").unwrap();

        let written = validate_columns(&input, &output, 3, b'|').unwrap();
        assert_eq!(written, 3);

        let text = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "a|b|");
        // Empty cells dropped before truncation.
        assert_eq!(lines[1], "c|d|e");
        assert_eq!(lines[2], "g||");
    }

    #[test]
    fn test_cross_reference_matches_numeric_ids() {
        let mut publications = Table::new();
        publications.push_row([("projectID", "101".to_string()), ("title", "a".to_string())]);
        publications.push_row([("projectID", "202".to_string()), ("title", "b".to_string())]);
        publications.push_row([("projectID", "n/a".to_string()), ("title", "c".to_string())]);

        let mut projects = Table::new();
        projects.push_row([("Project_ID", "202".to_string())]);
        projects.push_row([("Project_ID", "303".to_string())]);
        projects.push_row([("Project_ID", "".to_string())]);

        let matched = cross_reference(&publications, "projectID", &projects, "Project_ID").unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched.get(0, "title"), Some("b"));
    }

    #[test]
    fn test_cross_reference_missing_column() {
        let table = sample();
        let err = cross_reference(&table, "projectID", &table, "geo").unwrap_err();
        assert!(matches!(err, TableError::MissingColumn(name) if name == "projectID"));
    }
}
