//! Merging of JSON object files.
//!
//! Catalogue fragments are produced as one JSON object per run; combining
//! them is a shallow key merge where later files win.

use serde_json::{Map, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while combining JSON files.
#[derive(Error, Debug)]
pub enum CombineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("'{0}' does not contain a top-level JSON object")]
    NotAnObject(PathBuf),
}

/// Merge the top-level objects of `paths` in order; later files overwrite
/// earlier keys.
///
/// # Errors
///
/// Returns an error if a file cannot be read, is not valid JSON, or does
/// not hold a top-level object.
pub fn combine_files(paths: &[PathBuf]) -> Result<Map<String, Value>, CombineError> {
    let mut combined = Map::new();
    for path in paths {
        let reader = BufReader::new(File::open(path)?);
        let value: Value = serde_json::from_reader(reader)?;
        match value {
            Value::Object(object) => combined.extend(object),
            _ => return Err(CombineError::NotAnObject(path.clone())),
        }
    }
    Ok(combined)
}

/// Write a combined object to `path`, pretty-printed.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_combined(combined: &Map<String, Value>, path: &Path) -> Result<(), CombineError> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, combined)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_combine_later_files_overwrite() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("a.json");
        let second = dir.path().join("b.json");
        std::fs::write(&first, r#"{"101": {"x": 1}, "102": {"y": 2}}"#).unwrap();
        std::fs::write(&second, r#"{"102": {"y": 9}, "103": {"z": 3}}"#).unwrap();

        let combined = combine_files(&[first, second]).unwrap();
        assert_eq!(combined.len(), 3);
        assert_eq!(combined["102"], json!({"y": 9}));
        assert_eq!(combined["101"], json!({"x": 1}));
    }

    #[test]
    fn test_combine_rejects_non_object() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("list.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        let err = combine_files(&[path]).unwrap_err();
        assert!(matches!(err, CombineError::NotAnObject(_)));
    }

    #[test]
    fn test_write_combined_round_trip() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.json");
        let output = dir.path().join("out.json");
        std::fs::write(&input, r#"{"a": 1}"#).unwrap();

        let combined = combine_files(std::slice::from_ref(&input)).unwrap();
        write_combined(&combined, &output).unwrap();

        let text = std::fs::read_to_string(&output).unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, json!({"a": 1}));
    }
}
