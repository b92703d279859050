//! Implementation of the `aquifer xref` command.

use anyhow::{Context, Result};
use aquifer_core::{cross_reference, Table};
use std::path::PathBuf;

/// Options for the xref command.
#[derive(Debug)]
pub struct XrefOptions {
    /// File to filter.
    pub input: PathBuf,
    /// File holding the known project ids.
    pub reference: PathBuf,
    /// Id column in the input file.
    pub input_column: String,
    /// Id column in the reference file.
    pub reference_column: String,
    /// Output file.
    pub output: PathBuf,
    /// Field delimiter of both files.
    pub delimiter: u8,
}

/// Keep the input rows whose id appears in the reference file.
pub fn run(options: &XrefOptions) -> Result<()> {
    let input = Table::from_csv_path(&options.input, options.delimiter)
        .with_context(|| format!("failed to read '{}'", options.input.display()))?;
    let reference = Table::from_csv_path(&options.reference, options.delimiter)
        .with_context(|| format!("failed to read '{}'", options.reference.display()))?;

    let matched = cross_reference(
        &input,
        &options.input_column,
        &reference,
        &options.reference_column,
    )?;
    matched
        .to_csv_path(&options.output)
        .with_context(|| format!("failed to write '{}'", options.output.display()))?;

    println!(
        "{} of {} rows matched, written to {}",
        matched.len(),
        input.len(),
        options.output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_run_filters_by_reference_ids() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("publications.csv");
        let reference = dir.path().join("projects.csv");
        let output = dir.path().join("matched.csv");
        std::fs::write(
            &input,
            "projectID,title\n101,alpha\n202,beta\nbogus,gamma\n",
        )
        .unwrap();
        std::fs::write(&reference, "Project_ID\n202\n303\n").unwrap();

        let options = XrefOptions {
            input,
            reference,
            input_column: "projectID".to_string(),
            reference_column: "Project_ID".to_string(),
            output: output.clone(),
            delimiter: b',',
        };
        run(&options).unwrap();

        let matched = Table::from_csv_path(&output, b',').unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched.get(0, "title"), Some("beta"));
    }
}
