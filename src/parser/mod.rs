// src/parser/mod.rs

//! Listing page parsers.
//!
//! One parser per monitored topic. The orchestration code only depends on
//! the `PageParser` trait; the concrete selector logic lives in the
//! per-topic implementations.

mod cars;
mod listing;

use std::sync::OnceLock;

use regex::Regex;

use crate::error::Result;
use crate::models::{Item, ItemCollection, Topic};

pub use cars::CarParser;
pub use listing::ListingParser;

/// Extraction contract for one listing topic.
pub trait PageParser: Send + Sync {
    /// Which topic this parser covers.
    fn topic(&self) -> Topic;

    /// Parse one fetched listing page into a collection.
    ///
    /// Empty or absent input yields an empty collection tagged "fail",
    /// never an error. Individual malformed rows are skipped and logged.
    /// The only escalated failure is an unparseable date, which means the
    /// site layout changed and the whole scan needs attention.
    fn parse(&self, html: Option<&str>) -> Result<ItemCollection>;

    /// Whether this topic has detail pages worth a second fetch.
    fn supports_details(&self) -> bool {
        false
    }

    /// Merge detail-page fields into an already-parsed item.
    fn parse_details(&self, _html: &str, _item: &mut Item) {}
}

fn number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("literal regex"))
}

/// Extract the first contiguous digit run from whitespace-stripped text.
///
/// "1 200 €" parses as 1200; text without digits yields `None`, which is
/// the explicit unknown-price state, never zero.
pub fn extract_number(text: &str) -> Option<u32> {
    let no_ws: String = text.split_whitespace().collect();
    number_regex()
        .find(&no_ws)
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_number_joins_digit_groups() {
        assert_eq!(extract_number("1 200 €"), Some(1200));
        assert_eq!(extract_number("450€"), Some(450));
        assert_eq!(extract_number("  75  "), Some(75));
    }

    #[test]
    fn test_extract_number_without_digits() {
        assert_eq!(extract_number("Sovi hinnasta"), None);
        assert_eq!(extract_number(""), None);
    }

    #[test]
    fn test_extract_number_takes_first_run() {
        assert_eq!(extract_number("2008, 150 000 km"), Some(2008));
    }
}
