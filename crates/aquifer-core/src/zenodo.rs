//! Zenodo record search client.
//!
//! Pages through the Zenodo records API for each search phrase, keeps
//! recent records (publication date within a rolling window), and flattens
//! the deeply nested record metadata into table rows. The metadata is
//! traversed dynamically: Zenodo treats nearly every field as optional, so
//! typed structs would be all `Option`s anyway.

use crate::http::{self, FetchError};
use crate::table::Table;
use crate::text;
use chrono::{Duration, Local, NaiveDate};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde_json::Value;
use std::thread;

/// Records API endpoint.
pub const API_URL: &str = "https://zenodo.org/api/records";

/// Website search page, recorded per row for traceability.
pub const SEARCH_URL: &str = "https://zenodo.org/search";

/// Records requested per page.
const PAGE_SIZE: usize = 100;

/// Hard cap on records kept per search phrase.
const RESULTS_LIMIT: usize = 1000;

/// Environment variable holding an optional personal access token.
pub const TOKEN_ENV: &str = "ZENODO_TOKEN";

/// Column order of harvested Zenodo tables.
pub const COLUMN_ORDER: &[&str] = &[
    "record_id",
    "search_phrase",
    "title",
    "doi",
    "publication_date",
    "publication_year",
    "access",
    "keywords",
    "license",
    "version",
    "description",
    "creators",
    "file_count",
    "file_names",
    "file_sizes",
    "file_links",
    "views",
    "downloads",
    "subjects",
    "communities",
    "grants",
    "search_url",
    "record_page",
    "metadata_url",
    "related_identifiers",
];

/// Client for the Zenodo records API.
pub struct ZenodoClient {
    api_url: String,
    token: Option<String>,
    client: reqwest::blocking::Client,
}

impl ZenodoClient {
    /// Create a client against the public API, reading an access token
    /// from `ZENODO_TOKEN` if set. Public records work without one.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new() -> Result<Self, FetchError> {
        let token = std::env::var(TOKEN_ENV)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        if token.is_none() {
            log::warn!("no {TOKEN_ENV} in environment; continuing without Authorization header");
        }
        Self::with_api_url(API_URL, token)
    }

    /// Create a client against a custom endpoint (used in tests).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn with_api_url(
        api_url: impl Into<String>,
        token: Option<String>,
    ) -> Result<Self, FetchError> {
        Ok(Self {
            api_url: api_url.into(),
            token,
            client: http::client()?,
        })
    }

    /// Search for dataset records matching `query`, keeping records whose
    /// publication date falls within the last `years_window` years.
    /// Records with missing or invalid publication dates are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if a page cannot be fetched after retries.
    pub fn search(
        &self,
        query: &str,
        sort_by: &str,
        years_window: i64,
    ) -> Result<Vec<Value>, FetchError> {
        let min_date = Local::now().date_naive() - Duration::days(years_window * 365);
        let mut kept = Vec::new();
        let mut page = 1usize;

        loop {
            let response = self.fetch_page(query, sort_by, page)?;
            let results = response
                .pointer("/hits/hits")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            log::info!("query '{query}': {} results on page {page}", results.len());
            if results.is_empty() {
                break;
            }

            for record in results {
                if kept.len() >= RESULTS_LIMIT {
                    break;
                }
                if published_since(&record, min_date) {
                    kept.push(record);
                }
            }

            let has_next = response
                .pointer("/links/next")
                .is_some_and(|link| !link.is_null());
            if kept.len() >= RESULTS_LIMIT || !has_next {
                break;
            }
            page += 1;
        }

        Ok(kept)
    }

    fn fetch_page(&self, query: &str, sort_by: &str, page: usize) -> Result<Value, FetchError> {
        let params = [
            ("q", query.to_string()),
            ("size", PAGE_SIZE.to_string()),
            ("type", "dataset".to_string()),
            ("sort", sort_by.to_string()),
            ("page", page.to_string()),
            ("all_versions", "true".to_string()),
        ];

        http::with_retry(|| {
            let mut request = self.client.get(&self.api_url).query(&params);
            if let Some(token) = &self.token {
                request = request.header("Authorization", format!("Bearer {token}"));
            }
            let response = request.send().map_err(|e| FetchError::Network(e.to_string()))?;

            let status = response.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                // Honour Retry-After before the retry helper re-attempts.
                if let Some(seconds) = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                {
                    thread::sleep(std::time::Duration::from_secs(seconds));
                }
            }
            let text = response
                .text()
                .map_err(|e| FetchError::Network(e.to_string()))?;
            if !status.is_success() {
                return Err(http::api_error(status, &text));
            }
            serde_json::from_str(&text).map_err(|e| FetchError::Parse(e.to_string()))
        })
    }

    /// Search every phrase and collect the flattened results into one
    /// table with per-phrase record ids and the fixed column order.
    /// Phrases that fail after retries are logged and skipped.
    #[must_use]
    pub fn search_all(&self, phrases: &[String], sort_by: &str, years_window: i64) -> Table {
        let mut table = Table::with_columns(COLUMN_ORDER);
        for phrase in phrases {
            let search_url = search_page_url(phrase);
            log::info!("searching Zenodo for '{phrase}' ({search_url})");
            let records = match self.search(phrase, sort_by, years_window) {
                Ok(records) => records,
                Err(err) => {
                    log::warn!("skipping phrase '{phrase}': {err}");
                    continue;
                }
            };
            log::info!("{} records kept for '{phrase}'", records.len());

            for (index, record) in records.iter().enumerate() {
                let record_id = format!(
                    "opendata-{}-{:04}",
                    phrase.replace(' ', "_"),
                    index + 1
                );
                let mut cells = vec![("record_id", record_id)];
                cells.extend(extract_record(record, phrase, &search_url, &self.api_url));
                table.push_row(cells);
            }
        }
        table.reorder(COLUMN_ORDER);
        table
    }
}

/// Website search URL for a query, kept per row for traceability.
#[must_use]
pub fn search_page_url(query: &str) -> String {
    let encoded = utf8_percent_encode(query, NON_ALPHANUMERIC);
    format!("{SEARCH_URL}?q={encoded}&type=dataset")
}

fn published_since(record: &Value, min_date: NaiveDate) -> bool {
    record
        .pointer("/metadata/publication_date")
        .and_then(Value::as_str)
        .and_then(text::parse_date)
        .is_some_and(|date| date >= min_date)
}

fn str_field(record: &Value, pointer: &str) -> String {
    record
        .pointer(pointer)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn join_field(record: &Value, pointer: &str, key: &str) -> String {
    record
        .pointer(pointer)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| {
                    item.get(key)
                        .and_then(Value::as_str)
                        .unwrap_or("Unknown")
                        .to_string()
                })
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}

/// Flatten one record into `(column, value)` cells.
fn extract_record(
    record: &Value,
    phrase: &str,
    search_url: &str,
    api_url: &str,
) -> Vec<(&'static str, String)> {
    let id = record
        .get("id")
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_default();

    // Files are usually top-level in /api/records responses, with a
    // metadata fallback for older payloads.
    let files: Vec<Value> = record
        .get("files")
        .or_else(|| record.pointer("/metadata/files"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let file_names: Vec<String> = files
        .iter()
        .map(|f| {
            f.get("key")
                .or_else(|| f.get("filename"))
                .and_then(Value::as_str)
                .unwrap_or("Unknown")
                .to_string()
        })
        .collect();
    let file_sizes: Vec<String> = files
        .iter()
        .map(|f| f.get("size").map_or_else(|| "Unknown".to_string(), ToString::to_string))
        .collect();
    let file_links: Vec<String> = files
        .iter()
        .map(|f| {
            f.pointer("/links/self")
                .or_else(|| f.pointer("/links/download"))
                .and_then(Value::as_str)
                .unwrap_or("Unknown")
                .to_string()
        })
        .collect();

    let publication_date = str_field(record, "/metadata/publication_date");
    let publication_year = text::publication_year(&publication_date)
        .map(|y| y.to_string())
        .unwrap_or_default();
    let keywords = record
        .pointer("/metadata/keywords")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();

    vec![
        ("search_phrase", phrase.to_string()),
        ("search_url", search_url.to_string()),
        ("record_page", str_field(record, "/links/self_html")),
        ("metadata_url", format!("{api_url}/{id}")),
        ("title", str_field(record, "/metadata/title")),
        ("doi", str_field(record, "/metadata/doi")),
        (
            "description",
            text::clean_html(&str_field(record, "/metadata/description")),
        ),
        ("creators", join_field(record, "/metadata/creators", "name")),
        ("publication_date", publication_date),
        ("publication_year", publication_year),
        ("access", str_field(record, "/metadata/access_right")),
        ("keywords", keywords),
        ("license", str_field(record, "/metadata/license/id")),
        ("version", str_field(record, "/metadata/version")),
        ("file_count", files.len().to_string()),
        ("file_names", file_names.join(", ")),
        ("file_sizes", file_sizes.join(", ")),
        ("file_links", file_links.join(", ")),
        (
            "views",
            record
                .pointer("/stats/views")
                .map_or_else(|| "0".to_string(), ToString::to_string),
        ),
        (
            "downloads",
            record
                .pointer("/stats/downloads")
                .map_or_else(|| "0".to_string(), ToString::to_string),
        ),
        (
            "related_identifiers",
            join_field(record, "/metadata/related_identifiers", "identifier"),
        ),
        ("subjects", join_field(record, "/metadata/subjects", "term")),
        (
            "communities",
            join_field(record, "/metadata/communities", "title"),
        ),
        ("grants", join_field(record, "/metadata/grants", "id")),
    ]
}
