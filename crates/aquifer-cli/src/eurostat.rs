//! Implementation of the `aquifer eurostat` command.

use crate::output::{self, Format};
use anyhow::{Context, Result};
use aquifer_core::{EurostatClient, HarvestPlan};
use std::path::PathBuf;

/// Options for the eurostat command.
#[derive(Debug)]
pub struct EurostatOptions {
    /// Dataset codes overriding the plan's list, if any.
    pub datasets: Vec<String>,
    /// Output file; a timestamped name is generated when absent.
    pub output: Option<PathBuf>,
    /// Output format.
    pub format: Format,
}

/// Harvest the planned Eurostat datasets into one flat table.
pub fn run(plan: &HarvestPlan, options: &EurostatOptions) -> Result<()> {
    let mut section = plan.eurostat.clone();
    if !options.datasets.is_empty() {
        section.datasets.clone_from(&options.datasets);
    }

    let client = EurostatClient::new().context("failed to create Eurostat client")?;
    let table = client.harvest(&section);

    if table.is_empty() {
        println!("No data retrieved, nothing written.");
        return Ok(());
    }

    let path = output::write_table(&table, options.output.as_ref(), options.format, "eurostat_harvest")?;
    println!(
        "{} rows from {} dataset(s) written to {}",
        table.len(),
        section.datasets.len(),
        path.display()
    );
    Ok(())
}
