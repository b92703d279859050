//! Harvesting and decoding of open water-data catalogues.
//!
//! This crate provides:
//! - A JSON-stat cube decoder turning flattened statistical datasets into
//!   row-per-observation form
//! - Clients for the Eurostat, Zenodo, and CrossRef public APIs
//! - A flat table model with CSV and JSON writers
//! - Harvest-plan (`aquifer.toml`) parsing
//! - JSON catalogue merging and delimited-file normalization

pub mod combine;
pub mod crossref;
pub mod eurostat;
pub mod http;
pub mod jsonstat;
pub mod plan;
pub mod table;
pub mod text;
pub mod zenodo;

pub use combine::{combine_files, write_combined, CombineError};
pub use crossref::CrossRefClient;
pub use eurostat::{EurostatClient, EurostatError, RawDataset};
pub use http::FetchError;
pub use jsonstat::{
    CategoryIndex, Cube, DecodeError, DecodeErrorKind, Dimension, Observation, ValueStore,
};
pub use plan::{HarvestPlan, PlanError, PLAN_FILE};
pub use table::{cross_reference, validate_columns, Table, TableError};
pub use zenodo::ZenodoClient;

/// Crate version, surfaced in the CLI and the HTTP user agent.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
