// src/utils/http.rs

//! HTTP client utilities.

use std::time::{Duration, Instant};

use reqwest::Client;

use crate::error::Result;
use crate::models::ScraperConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_client(config: &ScraperConfig) -> Result<Client> {
    let client = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Fetch a page, logging size and duration.
///
/// A failed fetch is recovered to `None` so one bad page never stalls a
/// scan cycle; the error itself only shows up in the log.
pub async fn fetch_page(client: &Client, url: &str) -> Option<String> {
    let start = Instant::now();
    let result = async {
        let response = client.get(url).send().await?.error_for_status()?;
        response.text().await
    }
    .await;

    match result {
        Ok(body) => {
            let elapsed = start.elapsed().as_secs_f64();
            log::info!(
                "{} - {:.1} KB, took {:.2} s",
                url,
                body.len() as f64 / 1000.0,
                elapsed
            );
            Some(body)
        }
        Err(error) => {
            log::error!("failed to fetch {}: {}", url, error);
            None
        }
    }
}
