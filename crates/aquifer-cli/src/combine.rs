//! Implementation of the `aquifer combine` command.

use anyhow::{bail, Context, Result};
use aquifer_core::{combine_files, write_combined};
use std::path::{Path, PathBuf};

/// Merge JSON object files into one, later files overwriting earlier keys.
pub fn run(files: &[PathBuf], output: &Path) -> Result<()> {
    if files.is_empty() {
        bail!("provide at least one JSON file to combine");
    }

    let combined = combine_files(files).context("failed to combine JSON files")?;
    write_combined(&combined, output)
        .with_context(|| format!("failed to write '{}'", output.display()))?;

    println!(
        "{} keys from {} file(s) written to {}",
        combined.len(),
        files.len(),
        output.display()
    );
    Ok(())
}
