//! Implementation of the `aquifer validate` command.

use anyhow::{Context, Result};
use aquifer_core::validate_columns;
use std::path::PathBuf;

/// Options for the validate command.
#[derive(Debug)]
pub struct ValidateOptions {
    /// File to normalize.
    pub input: PathBuf,
    /// Normalized output file.
    pub output: PathBuf,
    /// Expected number of columns per row.
    pub columns: usize,
    /// Field delimiter.
    pub delimiter: u8,
}

/// Force every row of a delimited file to the expected column count.
pub fn run(options: &ValidateOptions) -> Result<()> {
    let rows = validate_columns(
        &options.input,
        &options.output,
        options.columns,
        options.delimiter,
    )
    .with_context(|| format!("failed to normalize '{}'", options.input.display()))?;

    println!(
        "{rows} rows normalized to {} columns, written to {}",
        options.columns,
        options.output.display()
    );
    Ok(())
}
