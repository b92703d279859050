//! Implementation of the `aquifer zenodo` command.

use crate::output::{self, Format};
use anyhow::{Context, Result};
use aquifer_core::{HarvestPlan, ZenodoClient};
use std::path::PathBuf;

/// Options for the zenodo command.
#[derive(Debug)]
pub struct ZenodoOptions {
    /// Search phrases overriding the plan's list, if any.
    pub phrases: Vec<String>,
    /// Output file; a timestamped name is generated when absent.
    pub output: Option<PathBuf>,
    /// Output format.
    pub format: Format,
}

/// Search Zenodo for every planned phrase and write the combined results.
pub fn run(plan: &HarvestPlan, options: &ZenodoOptions) -> Result<()> {
    let phrases = if options.phrases.is_empty() {
        &plan.zenodo.phrases
    } else {
        &options.phrases
    };

    let client = ZenodoClient::new().context("failed to create Zenodo client")?;
    let table = client.search_all(phrases, &plan.zenodo.sort, plan.zenodo.years);

    if table.is_empty() {
        println!("No results collected, nothing written.");
        return Ok(());
    }

    let path = output::write_table(&table, options.output.as_ref(), options.format, "zenodo_results")?;
    println!(
        "{} records from {} phrase(s) written to {}",
        table.len(),
        phrases.len(),
        path.display()
    );
    Ok(())
}
