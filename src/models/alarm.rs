//! Saved-search alarm rules.
//!
//! A rule fires for an item when all four predicates pass. Each predicate
//! defaults to passed when its rule field is unset, so a rule with no
//! constraints matches every item.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::item::Item;

/// One saved search, owned by a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlarmRule {
    pub id: u32,
    pub user_id: u32,

    /// Description regex, case-insensitive, matched from the start
    #[serde(default)]
    pub pattern: Option<String>,

    /// Location regex, same matching semantics as `pattern`
    #[serde(default)]
    pub location: Option<String>,

    /// Price ceiling, exclusive: an item at exactly this price does not match
    #[serde(default)]
    pub max_price: Option<u32>,

    /// Price floor, exclusive
    #[serde(default)]
    pub min_price: Option<u32>,
}

/// An alarm rule with its regexes compiled once per evaluation pass.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub rule: AlarmRule,
    pattern: Option<Regex>,
    location: Option<Regex>,
}

/// Compile a user-supplied pattern as a case-insensitive match-from-start
/// regex. The non-capturing group keeps alternations anchored.
fn compile_anchored(pattern: &str) -> Result<Regex> {
    Ok(RegexBuilder::new(&format!("^(?:{})", pattern))
        .case_insensitive(true)
        .build()?)
}

impl CompiledRule {
    pub fn compile(rule: AlarmRule) -> Result<CompiledRule> {
        let pattern = rule.pattern.as_deref().map(compile_anchored).transpose()?;
        let location = rule.location.as_deref().map(compile_anchored).transpose()?;
        Ok(CompiledRule {
            rule,
            pattern,
            location,
        })
    }

    /// Evaluate all four predicates against an item.
    ///
    /// The price bounds are both strict and only considered when the item
    /// has a known price: an active price predicate never passes for an
    /// unknown price.
    pub fn matches(&self, item: &Item) -> bool {
        let description_ok = self
            .pattern
            .as_ref()
            .is_none_or(|re| re.is_match(&item.description));

        let location_ok = self
            .location
            .as_ref()
            .is_none_or(|re| re.is_match(&item.location));

        let max_ok = self
            .rule
            .max_price
            .is_none_or(|max| item.price.is_some_and(|p| p < max));

        let min_ok = self
            .rule
            .min_price
            .is_none_or(|min| item.price.is_some_and(|p| p > min));

        description_ok && location_ok && max_ok && min_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::item::TradeKind;
    use chrono::NaiveDate;

    fn sofa(price: Option<u32>) -> Item {
        Item {
            id: 1,
            description: "Sofa for sale".to_string(),
            price,
            date: NaiveDate::from_ymd_opt(2024, 3, 5)
                .unwrap()
                .and_hms_opt(14, 30, 0)
                .unwrap(),
            location: "Pohjois-Savo".to_string(),
            category: "Sisustus ja huonekalut".to_string(),
            url: "https://www.tori.fi/sofa_1.htm".to_string(),
            image_url: None,
            trade_kind: TradeKind::Sell,
            car: None,
        }
    }

    fn rule(
        pattern: Option<&str>,
        location: Option<&str>,
        max_price: Option<u32>,
        min_price: Option<u32>,
    ) -> CompiledRule {
        CompiledRule::compile(AlarmRule {
            id: 1,
            user_id: 1,
            pattern: pattern.map(str::to_string),
            location: location.map(str::to_string),
            max_price,
            min_price,
        })
        .unwrap()
    }

    #[test]
    fn test_empty_rule_matches_everything() {
        assert!(rule(None, None, None, None).matches(&sofa(Some(1))));
        assert!(rule(None, None, None, None).matches(&sofa(None)));
    }

    #[test]
    fn test_pattern_is_case_insensitive_and_anchored() {
        let r = rule(Some("sofa"), None, None, None);
        assert!(r.matches(&sofa(Some(100))));

        let mut item = sofa(Some(100));
        item.description = "Nice sofa".to_string();
        // "sofa" appears but not at the start
        assert!(!r.matches(&item));
    }

    #[test]
    fn test_location_pattern() {
        let r = rule(None, Some("pohjois-savo"), None, None);
        assert!(r.matches(&sofa(Some(100))));

        let r = rule(None, Some("Lappi"), None, None);
        assert!(!r.matches(&sofa(Some(100))));
    }

    #[test]
    fn test_max_price_boundary_is_strict() {
        let r = rule(Some("sofa"), None, Some(500), None);
        assert!(r.matches(&sofa(Some(499))));
        assert!(!r.matches(&sofa(Some(500))));
        assert!(!r.matches(&sofa(Some(501))));
    }

    #[test]
    fn test_min_price_boundary_is_strict() {
        let r = rule(None, None, None, Some(100));
        assert!(r.matches(&sofa(Some(101))));
        assert!(!r.matches(&sofa(Some(100))));
    }

    #[test]
    fn test_active_price_predicate_fails_for_unknown_price() {
        assert!(!rule(None, None, Some(500), None).matches(&sofa(None)));
        assert!(!rule(None, None, None, Some(10)).matches(&sofa(None)));
    }

    #[test]
    fn test_invalid_regex_is_an_error() {
        let r = CompiledRule::compile(AlarmRule {
            id: 1,
            user_id: 1,
            pattern: Some("(unclosed".to_string()),
            location: None,
            max_price: None,
            min_price: None,
        });
        assert!(r.is_err());
    }
}
