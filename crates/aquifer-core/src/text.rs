//! Text cleanup helpers for API-returned fields.
//!
//! Zenodo descriptions and CrossRef abstracts come back with embedded
//! HTML/JATS markup; writers want plain, single-line text.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("valid regex"))
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

fn entity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"&(#\d+|[a-zA-Z]+);").expect("valid regex"))
}

/// Decode common HTML entities, strip tags, and collapse whitespace.
#[must_use]
pub fn clean_html(text: &str) -> String {
    let decoded = entity_re().replace_all(text, |caps: &regex::Captures<'_>| {
        match &caps[1] {
            "amp" => "&".to_string(),
            "lt" => "<".to_string(),
            "gt" => ">".to_string(),
            "quot" => "\"".to_string(),
            "apos" => "'".to_string(),
            "nbsp" => " ".to_string(),
            numeric => numeric
                .strip_prefix('#')
                .and_then(|n| n.parse::<u32>().ok())
                .and_then(char::from_u32)
                .map_or_else(|| caps[0].to_string(), |c| c.to_string()),
        }
    });
    let stripped = tag_re().replace_all(&decoded, " ");
    whitespace_re().replace_all(&stripped, " ").trim().to_string()
}

/// Whether `date` is a valid ISO date (`YYYY-MM-DD`).
#[must_use]
pub fn is_valid_date(date: &str) -> bool {
    parse_date(date).is_some()
}

/// Parse an ISO `YYYY-MM-DD` date.
#[must_use]
pub fn parse_date(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Extract the year from an ISO publication date.
#[must_use]
pub fn publication_year(date: &str) -> Option<i32> {
    parse_date(date).map(|d| d.year())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_html_strips_tags() {
        assert_eq!(
            clean_html("<p>Water <b>quality</b> data</p>"),
            "Water quality data"
        );
    }

    #[test]
    fn test_clean_html_decodes_entities() {
        assert_eq!(
            clean_html("rivers&nbsp;&amp;&nbsp;lakes &#8212; 2020"),
            "rivers & lakes \u{2014} 2020"
        );
    }

    #[test]
    fn test_clean_html_collapses_whitespace() {
        assert_eq!(clean_html("  a \n\n b\t c  "), "a b c");
    }

    #[test]
    fn test_clean_html_keeps_unknown_entities() {
        assert_eq!(clean_html("&bogus;"), "&bogus;");
    }

    #[test]
    fn test_clean_html_jats_markup() {
        assert_eq!(
            clean_html("<jats:p>Abstract about groundwater.</jats:p>"),
            "Abstract about groundwater."
        );
    }

    #[test]
    fn test_is_valid_date() {
        assert!(is_valid_date("2021-03-15"));
        assert!(!is_valid_date("2021-13-01"));
        assert!(!is_valid_date("15/03/2021"));
        assert!(!is_valid_date(""));
    }

    #[test]
    fn test_publication_year() {
        assert_eq!(publication_year("2019-06-01"), Some(2019));
        assert_eq!(publication_year("not a date"), None);
    }
}
