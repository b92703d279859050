//! Aquifer CLI - harvest open water-data catalogues into flat tables.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

mod abstracts;
mod combine;
mod eurostat;
mod output;
mod validate;
mod xref;
mod zenodo;

#[derive(Parser)]
#[command(name = "aquifer")]
#[command(version = aquifer_core::VERSION)]
#[command(about = "Harvest open water-data catalogues", long_about = None)]
struct Cli {
    /// Path to the harvest plan (defaults to aquifer.toml when present)
    #[arg(long, global = true)]
    plan: Option<PathBuf>,

    /// Logging level (DEBUG, INFO, WARN, ERROR)
    #[arg(long, global = true, default_value = "INFO")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest Eurostat datasets into a flat table
    Eurostat {
        /// Harvest only these dataset codes instead of the plan's list
        #[arg(long = "dataset")]
        datasets: Vec<String>,

        /// Output file (defaults to a timestamped name)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (csv or json)
        #[arg(short, long, default_value = "csv")]
        format: String,
    },

    /// Search Zenodo for recent dataset records
    Zenodo {
        /// Search phrases (defaults to the plan's list)
        phrases: Vec<String>,

        /// Output file (defaults to a timestamped name)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (csv or json)
        #[arg(short, long, default_value = "csv")]
        format: String,
    },

    /// Fetch publication abstracts from CrossRef
    Abstract {
        /// DOI to look up
        doi: Option<String>,

        /// CSV file with a DOI column to process in bulk
        #[arg(long, conflicts_with = "doi")]
        input: Option<PathBuf>,

        /// Name of the DOI column in the input file
        #[arg(long, default_value = "doi")]
        column: String,

        /// Output CSV for bulk mode (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of parallel lookups in bulk mode
        #[arg(long, default_value_t = aquifer_core::crossref::DEFAULT_WORKERS)]
        workers: usize,
    },

    /// Keep rows of a CSV whose project id appears in a reference CSV
    Xref {
        /// File to filter
        input: PathBuf,

        /// File holding the known project ids
        reference: PathBuf,

        /// Id column in the input file
        #[arg(long, default_value = "projectID")]
        input_column: String,

        /// Id column in the reference file
        #[arg(long, default_value = "Project_ID")]
        reference_column: String,

        /// Output file
        #[arg(short, long, default_value = "cross_referenced_output.csv")]
        output: PathBuf,

        /// Field delimiter of both input files
        #[arg(long, default_value_t = ',')]
        delimiter: char,
    },

    /// Normalize a delimited file to a fixed column count
    Validate {
        /// File to normalize
        input: PathBuf,

        /// Normalized output file
        output: PathBuf,

        /// Expected number of columns per row
        #[arg(long)]
        columns: usize,

        /// Field delimiter
        #[arg(long, default_value_t = '|')]
        delimiter: char,
    },

    /// Merge JSON object files, later files overwriting earlier keys
    Combine {
        /// Files to merge, in order
        files: Vec<PathBuf>,

        /// Output file
        #[arg(short, long, default_value = "combined_data.json")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    match cli.command {
        Commands::Eurostat {
            datasets,
            output,
            format,
        } => {
            let plan = load_plan(cli.plan.as_deref())?;
            let options = eurostat::EurostatOptions {
                datasets,
                output,
                format: output::Format::parse(&format)?,
            };
            eurostat::run(&plan, &options)?;
        }

        Commands::Zenodo {
            phrases,
            output,
            format,
        } => {
            let plan = load_plan(cli.plan.as_deref())?;
            let options = zenodo::ZenodoOptions {
                phrases,
                output,
                format: output::Format::parse(&format)?,
            };
            zenodo::run(&plan, &options)?;
        }

        Commands::Abstract {
            doi,
            input,
            column,
            output,
            workers,
        } => {
            let options = abstracts::AbstractOptions {
                doi,
                input,
                column,
                output,
                workers,
            };
            abstracts::run(&options)?;
        }

        Commands::Xref {
            input,
            reference,
            input_column,
            reference_column,
            output,
            delimiter,
        } => {
            let options = xref::XrefOptions {
                input,
                reference,
                input_column,
                reference_column,
                output,
                delimiter: byte_delimiter(delimiter)?,
            };
            xref::run(&options)?;
        }

        Commands::Validate {
            input,
            output,
            columns,
            delimiter,
        } => {
            let options = validate::ValidateOptions {
                input,
                output,
                columns,
                delimiter: byte_delimiter(delimiter)?,
            };
            validate::run(&options)?;
        }

        Commands::Combine { files, output } => {
            combine::run(&files, &output)?;
        }
    }

    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let level = match level.to_uppercase().as_str() {
        "TRACE" => log::LevelFilter::Trace,
        "DEBUG" => log::LevelFilter::Debug,
        "INFO" => log::LevelFilter::Info,
        "WARN" => log::LevelFilter::Warn,
        "ERROR" => log::LevelFilter::Error,
        other => anyhow::bail!("unknown log level '{other}'"),
    };
    simple_logger::SimpleLogger::new()
        .with_level(level)
        .init()
        .context("failed to initialize logging")?;
    Ok(())
}

/// Load the harvest plan: an explicit `--plan` path must exist; otherwise
/// `aquifer.toml` in the working directory is used when present, falling
/// back to the built-in defaults.
fn load_plan(path: Option<&Path>) -> Result<aquifer_core::HarvestPlan> {
    if let Some(path) = path {
        return aquifer_core::HarvestPlan::from_path(path)
            .with_context(|| format!("failed to load plan '{}'", path.display()));
    }
    let default = Path::new(aquifer_core::PLAN_FILE);
    if default.exists() {
        return aquifer_core::HarvestPlan::from_path(default)
            .with_context(|| format!("failed to load plan '{}'", default.display()));
    }
    Ok(aquifer_core::HarvestPlan::default())
}

fn byte_delimiter(delimiter: char) -> Result<u8> {
    u8::try_from(delimiter).map_err(|_| {
        anyhow::anyhow!("delimiter '{delimiter}' is not a single-byte character")
    })
}
