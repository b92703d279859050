//! Harvest plan (`aquifer.toml`) parsing and validation.
//!
//! A plan names the Eurostat datasets and Zenodo search phrases a harvest
//! should cover, with their filters. Everything has a built-in default so
//! the tool is useful without a plan file: the defaults mirror the
//! national water statistics (`env_wat_*` family) and the water-domain
//! search phrases the project tracks.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Default plan file name.
pub const PLAN_FILE: &str = "aquifer.toml";

/// Errors that can occur when loading a plan.
#[derive(Error, Debug)]
pub enum PlanError {
    #[error("failed to read plan file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse plan: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid plan: {0}")]
    Invalid(&'static str),
}

/// The complete harvest plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarvestPlan {
    /// Eurostat harvest section.
    #[serde(default)]
    pub eurostat: EurostatPlan,

    /// Zenodo search section.
    #[serde(default)]
    pub zenodo: ZenodoPlan,
}

/// Eurostat section of a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EurostatPlan {
    /// Dataset codes to harvest.
    #[serde(default = "default_datasets")]
    pub datasets: Vec<String>,

    /// Response language.
    #[serde(default = "default_lang")]
    pub lang: String,

    /// Per-dimension filter values, applied to every dataset. Dimensions
    /// not listed are left unfiltered ("all").
    #[serde(default = "default_filters")]
    pub filters: BTreeMap<String, Vec<String>>,

    /// Preferred output column order; columns not present in the harvest
    /// are ignored, columns not listed are dropped.
    #[serde(default = "default_columns")]
    pub columns: Vec<String>,
}

impl Default for EurostatPlan {
    fn default() -> Self {
        Self {
            datasets: default_datasets(),
            lang: default_lang(),
            filters: default_filters(),
            columns: default_columns(),
        }
    }
}

/// Zenodo section of a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ZenodoPlan {
    /// Search phrases.
    #[serde(default = "default_phrases")]
    pub phrases: Vec<String>,

    /// Sort order passed to the API.
    #[serde(default = "default_sort")]
    pub sort: String,

    /// Keep records published within this many years.
    #[serde(default = "default_years")]
    pub years: i64,
}

impl Default for ZenodoPlan {
    fn default() -> Self {
        Self {
            phrases: default_phrases(),
            sort: default_sort(),
            years: default_years(),
        }
    }
}

impl Default for HarvestPlan {
    fn default() -> Self {
        Self {
            eurostat: EurostatPlan::default(),
            zenodo: ZenodoPlan::default(),
        }
    }
}

impl HarvestPlan {
    /// Parse a plan from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or fails validation.
    pub fn parse(text: &str) -> Result<Self, PlanError> {
        let plan: Self = toml::from_str(text)?;
        plan.validate()?;
        Ok(plan)
    }

    /// Load a plan from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PlanError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    fn validate(&self) -> Result<(), PlanError> {
        if self.eurostat.lang.is_empty() {
            return Err(PlanError::Invalid("eurostat.lang must not be empty"));
        }
        if self.zenodo.years < 1 {
            return Err(PlanError::Invalid("zenodo.years must be at least 1"));
        }
        Ok(())
    }
}

fn default_lang() -> String {
    "EN".to_string()
}

fn default_sort() -> String {
    "mostrecent".to_string()
}

fn default_years() -> i64 {
    5
}

fn default_datasets() -> Vec<String> {
    // National water statistics family.
    [
        "env_wat_ltaa", // renewable freshwater resources, long-term annual averages
        "env_wat_res",  // renewable freshwater resources
        "env_wat_abs",  // annual freshwater abstraction by source and sector
        "env_wat_use",  // water made available for use
        "env_wat_pop",  // population connected to public water supply
        "env_wat_bal",
        "env_wat_con",
        "env_wat_spd",
        "env_wat_genv",
        "env_wat_genp",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

fn default_filters() -> BTreeMap<String, Vec<String>> {
    let years: Vec<String> = (2015..=2024).map(|y| y.to_string()).collect();
    let countries = [
        "EU27_2020", "AL", "AT", "BA", "BE", "BG", "BY", "CH", "CY", "CZ", "DE", "DK", "EE",
        "ES", "FI", "FR", "GR", "HR", "HU", "IE", "IS", "IT", "LT", "LU", "LV", "MD", "ME",
        "MK", "MT", "NL", "NM", "NO", "PL", "PT", "RO", "RS", "RU", "SE", "SI", "SK", "TR",
        "UA", "UK",
    ]
    .iter()
    .map(ToString::to_string)
    .collect();

    let mut filters = BTreeMap::new();
    filters.insert("time".to_string(), years);
    filters.insert("geo".to_string(), countries);
    filters
}

fn default_columns() -> Vec<String> {
    [
        "record_id",
        "dataset_code",
        "freq",
        "wat_proc",
        "unit",
        "geo",
        "time",
        "value",
        "wat_src",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

fn default_phrases() -> Vec<String> {
    [
        "river",
        "reservoir",
        "aquifers",
        "underground water",
        "lake",
        "lagoon",
        "ocean",
        "coastal",
        "ice",
        "sea",
        "waste water",
        "snow",
        "groundwater",
        "flood",
        "flash floods",
        "drought",
        "flow",
        "marine biodiversity",
        "leakage",
        "oil spill",
        "water quality",
        "irrigation",
        "water transport",
        "glacier",
        "water distribution",
        "rainfall",
        "water supply",
        "water contamination",
        "water treatment",
        "water grid operation",
        "rain water",
        "precipitation",
        "water consumption",
        "water demand",
        "water conservation",
        "hydrology",
        "natural hazard",
        "snow melt",
        "extreme weather",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}
