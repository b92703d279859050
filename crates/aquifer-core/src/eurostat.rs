//! Eurostat Statistics API client.
//!
//! Fetches JSON-stat 2.0 datasets from the dissemination API, converts the
//! raw response into a [`Cube`], and harvests whole plans of datasets into
//! a flat [`Table`]. Datasets that are not available for dissemination
//! (HTTP 404) are skipped rather than failing a whole harvest, matching
//! how the API is meant to be crawled.

use crate::http::{self, FetchError};
use crate::jsonstat::{CategoryIndex, Cube, DecodeError, Dimension, ValueStore};
use crate::plan::EurostatPlan;
use crate::table::{self, Table};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Base URL of the Eurostat dissemination statistics API.
pub const BASE_URL: &str =
    "https://ec.europa.eu/eurostat/api/dissemination/statistics/1.0/data";

/// Column carrying the source dataset code in harvested tables.
pub const DATASET_CODE_COLUMN: &str = "dataset_code";

/// Column carrying the generated record identifier.
pub const RECORD_ID_COLUMN: &str = "record_id";

/// Errors from the Eurostat client.
#[derive(Error, Debug)]
pub enum EurostatError {
    /// The dataset is not available for dissemination (HTTP 404).
    #[error("dataset '{0}' is not available for dissemination")]
    DatasetUnavailable(String),

    /// Transport or API failure.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The response decoded to a structurally invalid cube.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Raw JSON-stat 2.0 dataset as returned by the API.
#[derive(Debug, Deserialize)]
pub struct RawDataset {
    /// Dimension identifiers in flattening order.
    pub id: Vec<String>,
    /// Declared size per dimension, parallel to `id`.
    pub size: Vec<usize>,
    /// Per-dimension category descriptions.
    pub dimension: HashMap<String, RawDimension>,
    /// Dense array or sparse object of observation values.
    pub value: Value,
}

#[derive(Debug, Deserialize)]
pub struct RawDimension {
    pub category: RawCategory,
}

#[derive(Debug, Deserialize)]
pub struct RawCategory {
    #[serde(default)]
    pub index: Option<RawIndex>,
}

/// JSON-stat writes `category.index` either as a code -> position object
/// or as an ordered array of codes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawIndex {
    Mapped(HashMap<String, usize>),
    Ordered(Vec<String>),
}

impl RawDataset {
    /// Parse a response body, unwrapping the legacy `dataset` envelope if
    /// present.
    ///
    /// # Errors
    ///
    /// Returns a parse error if the body is not a JSON-stat dataset.
    pub fn from_response(body: Value) -> Result<Self, FetchError> {
        let body = match body {
            Value::Object(mut object) if object.contains_key("dataset") => {
                object.remove("dataset").unwrap_or(Value::Null)
            }
            other => other,
        };
        serde_json::from_value(body).map_err(|e| FetchError::Parse(e.to_string()))
    }

    /// Convert the raw dataset into a decodable [`Cube`].
    ///
    /// A dimension listed in `id` but absent from `dimension` (or present
    /// without an index) contributes an empty category set and falls under
    /// the decoder's placeholder rule.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCube` if the value store is neither an array nor an
    /// object, or holds non-numeric entries.
    pub fn into_cube(self) -> Result<Cube, DecodeError> {
        let mut dimensions = Vec::with_capacity(self.id.len());
        for (position, name) in self.id.iter().enumerate() {
            let size = self.size.get(position).copied().unwrap_or(0);
            let index = match self.dimension.get(name).and_then(|d| d.category.index.as_ref()) {
                Some(RawIndex::Mapped(map)) => CategoryIndex::Mapped(map.clone()),
                Some(RawIndex::Ordered(codes)) => CategoryIndex::Ordered(codes.clone()),
                None => CategoryIndex::Mapped(HashMap::new()),
            };
            dimensions.push(Dimension {
                name: name.clone(),
                size,
                index,
            });
        }

        let values = match self.value {
            Value::Array(entries) => {
                let mut dense = Vec::with_capacity(entries.len());
                for entry in entries {
                    match entry {
                        Value::Null => dense.push(None),
                        Value::Number(n) => dense.push(n.as_f64()),
                        other => {
                            return Err(DecodeError::UnsupportedValueStore(format!(
                                "non-numeric dense entry: {other}"
                            )))
                        }
                    }
                }
                ValueStore::Dense(dense)
            }
            Value::Object(entries) => {
                let mut sparse = HashMap::with_capacity(entries.len());
                for (key, entry) in entries {
                    match entry {
                        // Explicit nulls and absent keys are both "no
                        // observation"; the distinction is not kept.
                        Value::Null => {}
                        Value::Number(n) => {
                            if let Some(number) = n.as_f64() {
                                sparse.insert(key, number);
                            }
                        }
                        other => {
                            return Err(DecodeError::UnsupportedValueStore(format!(
                                "non-numeric sparse entry at '{key}': {other}"
                            )))
                        }
                    }
                }
                ValueStore::Sparse(sparse)
            }
            other => {
                return Err(DecodeError::UnsupportedValueStore(format!(
                    "expected array or object, got {other}"
                )))
            }
        };

        Ok(Cube { dimensions, values })
    }
}

/// Client for the Eurostat dissemination statistics API.
pub struct EurostatClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl EurostatClient {
    /// Create a client against the public API.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_base_url(BASE_URL)
    }

    /// Create a client against a custom base URL (used in tests).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, FetchError> {
        Ok(Self {
            base_url: base_url.into(),
            client: http::client()?,
        })
    }

    /// Fetch one dataset and decode it into a cube.
    ///
    /// Filters become repeated query parameters, one `dim=value` pair per
    /// value; empty values are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`EurostatError::DatasetUnavailable`] for HTTP 404 so
    /// callers can skip and continue, or another error for transport,
    /// API, and decode failures.
    pub fn fetch_dataset(
        &self,
        code: &str,
        filters: &BTreeMap<String, Vec<String>>,
        lang: &str,
    ) -> Result<Cube, EurostatError> {
        let mut params: Vec<(String, String)> = vec![("lang".to_string(), lang.to_string())];
        for (name, values) in filters {
            for value in values {
                let value = value.trim();
                if !value.is_empty() {
                    params.push((name.clone(), value.to_string()));
                }
            }
        }

        let url = format!("{}/{}", self.base_url, code);
        let body = http::with_retry(|| {
            let response = self
                .client
                .get(&url)
                .query(&params)
                .send()
                .map_err(|e| FetchError::Network(e.to_string()))?;

            let status = response.status();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(FetchError::Unavailable(code.to_string()));
            }
            let text = response
                .text()
                .map_err(|e| FetchError::Network(e.to_string()))?;
            if !status.is_success() {
                return Err(http::api_error(status, &text));
            }
            serde_json::from_str::<Value>(&text).map_err(|e| FetchError::Parse(e.to_string()))
        })
        .map_err(|err| match err {
            FetchError::Unavailable(_) => EurostatError::DatasetUnavailable(code.to_string()),
            other => EurostatError::Fetch(other),
        })?;

        let raw = RawDataset::from_response(body)?;
        Ok(raw.into_cube()?)
    }

    /// Harvest every dataset in the plan into one flat table.
    ///
    /// Failed datasets are logged and skipped; the harvest never aborts on
    /// a single dataset. Rows are tagged with the dataset code, numbered
    /// `eurostat-{code}-{0001..}`, and the plan's preferred column order
    /// is applied at the end.
    #[must_use]
    pub fn harvest(&self, plan: &EurostatPlan) -> Table {
        let mut combined = Table::new();
        for code in &plan.datasets {
            log::info!("fetching Eurostat dataset {code}");
            let cube = match self.fetch_dataset(code, &plan.filters, &plan.lang) {
                Ok(cube) => cube,
                Err(err) => {
                    log::warn!("skipping dataset '{code}': {err}");
                    continue;
                }
            };
            let observations = match cube.decode() {
                Ok(observations) => observations,
                Err(err) => {
                    log::warn!("skipping dataset '{code}': {err}");
                    continue;
                }
            };
            if observations.is_empty() {
                log::warn!("no data returned for {code}");
                continue;
            }

            log::info!("{} rows retrieved for {code}", observations.len());
            for (row, observation) in observations.iter().enumerate() {
                let record_id = format!("eurostat-{code}-{:04}", row + 1);
                let cells = [
                    (RECORD_ID_COLUMN, record_id),
                    (DATASET_CODE_COLUMN, code.clone()),
                ]
                .into_iter()
                .chain(
                    observation
                        .coordinates
                        .iter()
                        .map(|(name, value)| (name.as_str(), value.clone())),
                )
                .chain([("value", table::format_value(observation.value))]);
                combined.push_row(cells);
            }
        }

        if !plan.columns.is_empty() {
            let preferred: Vec<&str> = plan.columns.iter().map(String::as_str).collect();
            combined.reorder(&preferred);
        }
        combined
    }
}
