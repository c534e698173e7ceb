//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and page-fetch behavior settings
    #[serde(default)]
    pub scraper: ScraperConfig,

    /// Scan loop cadence settings
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Storage location settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Which listing topics to monitor
    #[serde(default)]
    pub topics: TopicsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.scraper.base_url.trim().is_empty() {
            return Err(AppError::validation("scraper.base_url is empty"));
        }
        if self.scraper.user_agent.trim().is_empty() {
            return Err(AppError::validation("scraper.user_agent is empty"));
        }
        if self.scraper.timeout_secs == 0 {
            return Err(AppError::validation("scraper.timeout_secs must be > 0"));
        }
        if self.scraper.max_concurrent == 0 {
            return Err(AppError::validation("scraper.max_concurrent must be > 0"));
        }
        if self.scraper.max_pages == 0 {
            return Err(AppError::validation("scraper.max_pages must be > 0"));
        }
        if self.scraper.keep_items == 0 {
            return Err(AppError::validation("scraper.keep_items must be > 0"));
        }
        if !self.topics.general && !self.topics.cars {
            return Err(AppError::validation("no topics enabled"));
        }
        Ok(())
    }
}

/// HTTP client and page-fetch behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Site root
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Region path segment of the listing index
    #[serde(default = "defaults::region")]
    pub region: String,

    /// Maximum listing pages scanned per cycle
    #[serde(default = "defaults::max_pages")]
    pub max_pages: usize,

    /// Retention bound for the known-items baseline
    #[serde(default = "defaults::keep_items")]
    pub keep_items: usize,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Maximum concurrent page/detail fetches
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Delay between fetch batches in milliseconds
    #[serde(default)]
    pub request_delay_ms: u64,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            region: defaults::region(),
            max_pages: defaults::max_pages(),
            keep_items: defaults::keep_items(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_concurrent: defaults::max_concurrent(),
            request_delay_ms: 0,
        }
    }
}

/// Scan loop cadence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Base sleep between cycles in seconds
    #[serde(default = "defaults::base_delay")]
    pub base_delay_secs: u64,

    /// Upper bound of the random jitter added to the base sleep
    #[serde(default = "defaults::jitter_max")]
    pub jitter_max_secs: u64,

    /// Stop a scan after this many pages yielded nothing new
    #[serde(default = "defaults::stale_page_limit")]
    pub stale_page_limit: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            base_delay_secs: defaults::base_delay(),
            jitter_max_secs: defaults::jitter_max(),
            stale_page_limit: defaults::stale_page_limit(),
        }
    }
}

/// Storage location settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for the JSON store
    #[serde(default = "defaults::data_dir")]
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir(),
        }
    }
}

/// Topic enablement flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicsConfig {
    /// Monitor the all-categories listing index
    #[serde(default = "defaults::enabled")]
    pub general: bool,

    /// Monitor the car listings, with detail-page enrichment
    #[serde(default = "defaults::enabled")]
    pub cars: bool,
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            general: true,
            cars: true,
        }
    }
}

mod defaults {
    pub fn base_url() -> String {
        "https://www.tori.fi".to_string()
    }

    pub fn region() -> String {
        "koko_suomi".to_string()
    }

    pub fn max_pages() -> usize {
        100
    }

    pub fn keep_items() -> usize {
        8000
    }

    pub fn user_agent() -> String {
        "Mozilla/5.0 (X11; Linux x86_64) torivahti/0.1".to_string()
    }

    pub fn timeout() -> u64 {
        30
    }

    pub fn max_concurrent() -> usize {
        10
    }

    pub fn base_delay() -> u64 {
        180
    }

    pub fn jitter_max() -> u64 {
        60
    }

    pub fn stale_page_limit() -> usize {
        5
    }

    pub fn data_dir() -> String {
        "data".to_string()
    }

    pub fn enabled() -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_pages() {
        let mut config = Config::default();
        config.scraper.max_pages = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_no_topics() {
        let mut config = Config::default();
        config.topics.general = false;
        config.topics.cars = false;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [scraper]
            max_pages = 5

            [monitor]
            base_delay_secs = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.scraper.max_pages, 5);
        assert_eq!(config.scraper.keep_items, 8000);
        assert_eq!(config.monitor.base_delay_secs, 10);
        assert_eq!(config.monitor.jitter_max_secs, 60);
        assert!(config.topics.cars);
    }
}
