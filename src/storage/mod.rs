//! Persistence port for items, alarms and users.
//!
//! Schema concerns live entirely behind the `ItemStore` trait; the scan
//! loop and alarm engine only know these operations. The bundled
//! `JsonStore` keeps everything in flat JSON files so the binary runs
//! without a database.

pub mod json;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{AlarmRule, Item};

// Re-export for convenience
pub use json::JsonStore;

/// One dispatched alarm, kept for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmRecord {
    pub user_id: u32,
    pub item: Item,
    pub notified_at: NaiveDateTime,
}

/// Storage backend for listings, saved searches and users.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Load persisted general-topic items, optionally bounded to a date range.
    async fn get_items(
        &self,
        range: Option<(NaiveDateTime, NaiveDateTime)>,
    ) -> Result<Vec<Item>>;

    /// Persist new general-topic items.
    async fn store_items(&self, items: &[Item]) -> Result<()>;

    /// Load persisted car-topic items.
    async fn get_cars(&self) -> Result<Vec<Item>>;

    /// Persist new car-topic items.
    async fn store_cars(&self, items: &[Item]) -> Result<()>;

    /// All saved-search alarm rules.
    async fn get_alarms(&self) -> Result<Vec<AlarmRule>>;

    /// Contact address for a user, `None` when unknown.
    async fn get_user_email(&self, user_id: u32) -> Result<Option<String>>;

    /// Record a dispatched alarm for audit.
    async fn store_item_alarm(&self, user_id: u32, item: &Item) -> Result<()>;
}
