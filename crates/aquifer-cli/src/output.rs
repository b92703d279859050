//! Output format selection shared by the harvest commands.

use anyhow::{Context, Result};
use aquifer_core::table::{timestamped_path, Table};
use std::path::PathBuf;

/// Supported table output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    Json,
}

impl Format {
    /// Parse a format name.
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => anyhow::bail!("unknown output format '{other}' (expected csv or json)"),
        }
    }

    /// File extension for the format.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

/// Write `table` to `output`, or to a timestamped `{stem}_{...}.{ext}`
/// file when no output path is given. Returns the path written.
pub fn write_table(
    table: &Table,
    output: Option<&PathBuf>,
    format: Format,
    stem: &str,
) -> Result<PathBuf> {
    let path = output
        .cloned()
        .unwrap_or_else(|| timestamped_path(stem, format.extension()));
    match format {
        Format::Csv => table.to_csv_path(&path),
        Format::Json => table.to_json_path(&path),
    }
    .with_context(|| format!("failed to write '{}'", path.display()))?;
    Ok(path)
}
