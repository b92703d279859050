//! Implementation of the `aquifer abstract` command.

use anyhow::{bail, Context, Result};
use aquifer_core::{CrossRefClient, Table};
use std::io;
use std::path::PathBuf;

/// Options for the abstract command.
#[derive(Debug)]
pub struct AbstractOptions {
    /// Single DOI to look up.
    pub doi: Option<String>,
    /// CSV file with a DOI column for bulk mode.
    pub input: Option<PathBuf>,
    /// Name of the DOI column in the input file.
    pub column: String,
    /// Output CSV for bulk mode; stdout when absent.
    pub output: Option<PathBuf>,
    /// Number of parallel lookups.
    pub workers: usize,
}

/// Fetch one abstract to stdout, or a whole CSV column of DOIs in bulk.
pub fn run(options: &AbstractOptions) -> Result<()> {
    if let Some(doi) = &options.doi {
        let client = CrossRefClient::new().context("failed to create CrossRef client")?;
        match client
            .fetch_abstract(doi)
            .with_context(|| format!("lookup failed for '{doi}'"))?
        {
            Some(text) => println!("{text}"),
            None => println!("No abstract available"),
        }
        return Ok(());
    }

    let Some(input) = &options.input else {
        bail!("provide a DOI or --input <file>");
    };

    let table = Table::from_csv_path(input, b',')
        .with_context(|| format!("failed to read '{}'", input.display()))?;
    let dois = collect_dois(&table, &options.column)?;
    if dois.is_empty() {
        println!("No DOIs found in column '{}'.", options.column);
        return Ok(());
    }

    let client = CrossRefClient::new().context("failed to create CrossRef client")?;
    let abstracts = client.fetch_abstracts(&dois, options.workers);

    let mut results = Table::with_columns(&["doi", "abstract"]);
    let found = abstracts.iter().filter(|a| a.is_some()).count();
    for (doi, text) in dois.iter().zip(abstracts) {
        results.push_row([
            ("doi", doi.clone()),
            ("abstract", text.unwrap_or_default()),
        ]);
    }

    match &options.output {
        Some(path) => {
            results
                .to_csv_path(path)
                .with_context(|| format!("failed to write '{}'", path.display()))?;
            println!(
                "{found} of {} abstracts found, written to {}",
                dois.len(),
                path.display()
            );
        }
        None => {
            results.write_csv(io::stdout(), b',')?;
        }
    }
    Ok(())
}

/// Pull the non-empty DOIs out of a table column, preserving row order.
fn collect_dois(table: &Table, column: &str) -> Result<Vec<String>> {
    if !table.columns().iter().any(|c| c == column) {
        bail!("column '{column}' not found in input file");
    }
    Ok((0..table.len())
        .filter_map(|row| table.get(row, column))
        .map(str::trim)
        .filter(|doi| !doi.is_empty())
        .map(ToString::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_dois_skips_empty_cells() {
        let mut table = Table::new();
        table.push_row([("doi", "10.1000/a".to_string())]);
        table.push_row([("doi", "  ".to_string())]);
        table.push_row([("doi", "10.1000/b".to_string())]);

        let dois = collect_dois(&table, "doi").unwrap();
        assert_eq!(dois, vec!["10.1000/a", "10.1000/b"]);
    }

    #[test]
    fn test_collect_dois_missing_column() {
        let table = Table::with_columns(&["title"]);
        assert!(collect_dois(&table, "doi").is_err());
    }
}
