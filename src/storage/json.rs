//! Local filesystem JSON store.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── items.json        # general-topic baseline
//! ├── cars.json         # car-topic baseline
//! ├── alarms.json       # saved-search rules
//! ├── users.json        # user id -> email address
//! └── item_alarms.json  # dispatched-alarm audit trail
//! ```
//!
//! Writes go through a temp file and rename, so a crash mid-write never
//! leaves a truncated baseline behind.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{AlarmRule, Item};
use crate::storage::{AlarmRecord, ItemStore};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct JsonStore {
    root_dir: PathBuf,
}

impl JsonStore {
    /// Create a store rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn load_items(&self, key: &str) -> Result<Vec<Item>> {
        Ok(self.read_json(key).await?.unwrap_or_default())
    }

    /// Append new items to a baseline file, keyed by fingerprint so a
    /// re-persisted item never duplicates.
    async fn append_items(&self, key: &str, items: &[Item]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }

        let mut existing = self.load_items(key).await?;
        let known: std::collections::HashSet<_> =
            existing.iter().map(Item::fingerprint).collect();

        for item in items {
            if !known.contains(&item.fingerprint()) {
                existing.push(item.clone());
            }
        }

        self.write_json(key, &existing).await
    }
}

#[async_trait]
impl ItemStore for JsonStore {
    async fn get_items(
        &self,
        range: Option<(NaiveDateTime, NaiveDateTime)>,
    ) -> Result<Vec<Item>> {
        let items = self.load_items("items.json").await?;
        Ok(match range {
            Some((start, end)) => items
                .into_iter()
                .filter(|i| i.date >= start && i.date <= end)
                .collect(),
            None => items,
        })
    }

    async fn store_items(&self, items: &[Item]) -> Result<()> {
        self.append_items("items.json", items).await
    }

    async fn get_cars(&self) -> Result<Vec<Item>> {
        self.load_items("cars.json").await
    }

    async fn store_cars(&self, items: &[Item]) -> Result<()> {
        self.append_items("cars.json", items).await
    }

    async fn get_alarms(&self) -> Result<Vec<AlarmRule>> {
        Ok(self.read_json("alarms.json").await?.unwrap_or_default())
    }

    async fn get_user_email(&self, user_id: u32) -> Result<Option<String>> {
        let users: HashMap<String, String> =
            self.read_json("users.json").await?.unwrap_or_default();
        Ok(users.get(&user_id.to_string()).cloned())
    }

    async fn store_item_alarm(&self, user_id: u32, item: &Item) -> Result<()> {
        let mut records: Vec<AlarmRecord> = self
            .read_json("item_alarms.json")
            .await?
            .unwrap_or_default();
        records.push(AlarmRecord {
            user_id,
            item: item.clone(),
            notified_at: Local::now().naive_local(),
        });
        self.write_json("item_alarms.json", &records).await
    }
}
