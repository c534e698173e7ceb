// src/models/mod.rs

//! Domain models for the monitor application.

mod alarm;
mod collection;
mod config;
mod item;

// Re-export all public types
pub use alarm::{AlarmRule, CompiledRule};
pub use collection::ItemCollection;
pub use config::{Config, MonitorConfig, ScraperConfig, StorageConfig, TopicsConfig};
pub use item::{CarDetails, Fingerprint, Item, TradeKind, parse_date, parse_date_at};

/// A monitored listing scope. Each topic keeps its own baseline and scan
/// cycle; a failure in one never blocks the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// All-categories listing index
    General,
    /// Car listings, with detail-page enrichment
    Cars,
}

impl Topic {
    /// Path segment appended to the region URL, empty for the general index.
    pub fn path(&self) -> &'static str {
        match self {
            Topic::General => "",
            Topic::Cars => "/autot",
        }
    }

    /// Short name used in logs and storage keys.
    pub fn name(&self) -> &'static str {
        match self {
            Topic::General => "general",
            Topic::Cars => "cars",
        }
    }
}
