//! CrossRef abstract lookup.
//!
//! Looks up works by DOI and returns the abstract as plain text. Many
//! works simply have no abstract on CrossRef, so "no abstract" is a
//! regular `None`, not an error. Batch lookups fan out over a bounded
//! thread pool and preserve input order.

use crate::http::{self, FetchError};
use crate::text;
use rayon::prelude::*;
use serde_json::Value;

/// Works API endpoint.
pub const API_URL: &str = "https://api.crossref.org/works";

/// Default number of parallel lookups in batch mode.
pub const DEFAULT_WORKERS: usize = 5;

/// Client for the CrossRef works API.
pub struct CrossRefClient {
    api_url: String,
    client: reqwest::blocking::Client,
}

impl CrossRefClient {
    /// Create a client against the public API.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_api_url(API_URL)
    }

    /// Create a client against a custom endpoint (used in tests).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn with_api_url(api_url: impl Into<String>) -> Result<Self, FetchError> {
        Ok(Self {
            api_url: api_url.into(),
            client: http::client()?,
        })
    }

    /// Fetch the abstract of a work, cleaned to plain single-line text.
    ///
    /// Returns `Ok(None)` when the DOI is unknown to CrossRef or the work
    /// carries no abstract.
    ///
    /// # Errors
    ///
    /// Returns an error for transport or API failures other than 404.
    pub fn fetch_abstract(&self, doi: &str) -> Result<Option<String>, FetchError> {
        let url = format!("{}/{}", self.api_url, doi.trim());
        let body = match http::with_retry(|| {
            let response = self
                .client
                .get(&url)
                .send()
                .map_err(|e| FetchError::Network(e.to_string()))?;
            let status = response.status();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(FetchError::Unavailable(doi.trim().to_string()));
            }
            let text = response
                .text()
                .map_err(|e| FetchError::Network(e.to_string()))?;
            if !status.is_success() {
                return Err(http::api_error(status, &text));
            }
            serde_json::from_str::<Value>(&text).map_err(|e| FetchError::Parse(e.to_string()))
        }) {
            Ok(body) => body,
            Err(FetchError::Unavailable(_)) => return Ok(None),
            Err(err) => return Err(err),
        };

        Ok(extract_abstract(&body))
    }

    /// Fetch abstracts for many DOIs in parallel, preserving input order.
    ///
    /// Lookups that fail after retries are logged and yield `None`; a
    /// batch never aborts on a single DOI.
    #[must_use]
    pub fn fetch_abstracts(&self, dois: &[String], workers: usize) -> Vec<Option<String>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .build();
        let Ok(pool) = pool else {
            log::warn!("falling back to sequential lookups: thread pool unavailable");
            return dois
                .iter()
                .map(|doi| self.lookup_logged(doi))
                .collect();
        };

        pool.install(|| {
            dois.par_iter()
                .map(|doi| self.lookup_logged(doi))
                .collect()
        })
    }

    fn lookup_logged(&self, doi: &str) -> Option<String> {
        match self.fetch_abstract(doi) {
            Ok(result) => result,
            Err(err) => {
                log::warn!("abstract lookup failed for '{doi}': {err}");
                None
            }
        }
    }
}

/// Pull the abstract out of a works response and clean it.
fn extract_abstract(body: &Value) -> Option<String> {
    let raw = body.pointer("/message/abstract").and_then(Value::as_str)?;
    let cleaned = text::clean_html(raw);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_abstract_strips_jats_markup() {
        let body = json!({
            "message": {
                "abstract": "<jats:p>We model   aquifer\nrecharge.</jats:p>"
            }
        });
        assert_eq!(
            extract_abstract(&body),
            Some("We model aquifer recharge.".to_string())
        );
    }

    #[test]
    fn test_extract_abstract_absent() {
        assert_eq!(extract_abstract(&json!({"message": {}})), None);
        assert_eq!(extract_abstract(&json!({})), None);
    }

    #[test]
    fn test_extract_abstract_empty_after_cleaning() {
        let body = json!({"message": {"abstract": "<jats:p>  </jats:p>"}});
        assert_eq!(extract_abstract(&body), None);
    }
}
