//! Ordered container of listing items.
//!
//! An `ItemCollection` accumulates items across pages and scan cycles.
//! Item order is unspecified unless `sort_by_date` has just run; callers
//! that need chronological order re-establish it explicitly.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::item::Item;

/// A named, mutable group of items.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemCollection {
    /// Diagnostic tag, shows up in logs
    name: String,
    items: Vec<Item>,
}

impl ItemCollection {
    /// Create an empty collection.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
        }
    }

    /// Create a collection from existing items.
    pub fn with_items(name: impl Into<String>, items: Vec<Item>) -> Self {
        Self {
            name: name.into(),
            items,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Item> {
        self.items.iter_mut()
    }

    pub fn into_items(self) -> Vec<Item> {
        self.items
    }

    /// Append one item.
    pub fn push(&mut self, item: Item) {
        self.items.push(item);
    }

    /// Append all items from `other`. No dedup; diffing handles that.
    pub fn merge(&mut self, other: ItemCollection) {
        self.items.extend(other.items);
    }

    /// Find an item by listing id.
    pub fn find_by_id(&self, id: u64) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    /// Items of `self` whose fingerprint does not appear in `known`.
    ///
    /// The known fingerprints are collected into a set once, so this is
    /// linear in the two collection sizes.
    pub fn diff_against(&self, known: &ItemCollection) -> ItemCollection {
        let known_prints: HashSet<_> = known.items.iter().map(Item::fingerprint).collect();
        let items = self
            .items
            .iter()
            .filter(|i| !known_prints.contains(&i.fingerprint()))
            .cloned()
            .collect();
        ItemCollection::with_items("diff", items)
    }

    /// Drop everything that is not a sale listing.
    pub fn retain_sales(&mut self) {
        self.items
            .retain(|i| i.trade_kind == crate::models::item::TradeKind::Sell);
    }

    /// Stable ascending sort by posting time.
    pub fn sort_by_date(&mut self) {
        self.items.sort_by_key(|i| i.date);
    }

    /// Keep only the `n` chronologically newest items.
    ///
    /// Sorts ascending first, then drops from the front. This bounds the
    /// known-items baseline across the life of the process.
    pub fn truncate_to_newest(&mut self, n: usize) {
        self.sort_by_date();
        if self.items.len() > n {
            let discarded = self.items.len() - n;
            log::info!("{}: removing {} oldest items", self.name, discarded);
            self.items.drain(..discarded);
        }
    }

    /// Human-readable date range for cycle summaries.
    pub fn date_range_text(&self) -> String {
        let first = self.items.iter().map(|i| i.date).min();
        let last = self.items.iter().map(|i| i.date).max();
        match (first, last) {
            (Some(first), Some(last)) => format!(
                "{} - {}",
                first.format("%Y-%m-%d %H:%M"),
                last.format("%Y-%m-%d %H:%M")
            ),
            _ => "timerange n/a".to_string(),
        }
    }
}

impl fmt::Display for ItemCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            writeln!(f, "{}", item)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a ItemCollection {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl IntoIterator for ItemCollection {
    type Item = Item;
    type IntoIter = std::vec::IntoIter<Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
