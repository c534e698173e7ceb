// src/consumer.rs

//! Page fetch orchestration.
//!
//! A `PageConsumer` walks the paginated listing index for one topic,
//! fanning page fetches out over a bounded pool. Completion order is
//! irrelevant; the scan loop re-sorts by date downstream. Detail-page
//! enrichment uses the same pool discipline.

use std::ops::RangeInclusive;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::Client;

use crate::error::Result;
use crate::models::{Config, Item, ItemCollection};
use crate::parser::PageParser;
use crate::utils::http;

/// Paginated item source, as the scan loop sees it.
///
/// The scan loop only needs batched page fetches and detail enrichment;
/// keeping those behind a trait lets tests drive the loop with scripted
/// pages instead of live HTTP.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Total pages a scan may visit.
    fn max_pages(&self) -> usize;

    /// Pages fetched concurrently per batch.
    fn batch_size(&self) -> usize;

    /// Fetch a batch of pages, returned in page order.
    async fn fetch_batch(&self, pages: RangeInclusive<usize>) -> Vec<Result<ItemCollection>>;

    /// Enrich a whole collection with detail-page fields.
    async fn add_details_all(&self, items: ItemCollection) -> ItemCollection;
}

/// Fetches listing pages for one topic and hands them to its parser.
pub struct PageConsumer {
    client: Client,
    parser: Arc<dyn PageParser>,
    config: Arc<Config>,
}

impl PageConsumer {
    /// Create a consumer for the given topic parser.
    pub fn new(parser: Arc<dyn PageParser>, config: Arc<Config>) -> Result<Self> {
        let client = http::create_client(&config.scraper)?;
        Ok(Self {
            client,
            parser,
            config,
        })
    }

    /// Listing index URL for a 1-based page number.
    fn page_url(&self, page: usize) -> String {
        let scraper = &self.config.scraper;
        format!(
            "{}/{}{}?&o={}",
            scraper.base_url.trim_end_matches('/'),
            scraper.region,
            self.parser.topic().path(),
            page
        )
    }

    /// Fetch and parse a single listing page.
    ///
    /// The page is filtered down to sale listings and date-sorted before
    /// it reaches the diff step. A fetch failure parses as the empty
    /// "fail" collection.
    pub async fn fetch_page(&self, page: usize) -> Result<ItemCollection> {
        let url = self.page_url(page);
        let html = http::fetch_page(&self.client, &url).await;
        let mut items = self.parser.parse(html.as_deref())?;
        items.retain_sales();
        items.sort_by_date();
        Ok(items)
    }

    /// Enrich one item with its detail page, when the topic supports it.
    ///
    /// An enrichment failure leaves the item with its base fields only.
    pub async fn add_details(&self, item: &mut Item) {
        if !self.parser.supports_details() || item.url.is_empty() {
            return;
        }
        if let Some(html) = http::fetch_page(&self.client, &item.url).await {
            self.parser.parse_details(&html, item);
        }
    }
}

#[async_trait]
impl PageSource for PageConsumer {
    fn max_pages(&self) -> usize {
        self.config.scraper.max_pages
    }

    fn batch_size(&self) -> usize {
        self.config.scraper.max_concurrent.max(1)
    }

    /// Fetch a batch of pages concurrently, in page order of the input.
    ///
    /// The pool is bounded by `max_concurrent`; results are collected
    /// regardless of completion order and re-paired with their page
    /// numbers so the scan loop can reason about stop conditions.
    async fn fetch_batch(&self, pages: RangeInclusive<usize>) -> Vec<Result<ItemCollection>> {
        let mut results: Vec<(usize, Result<ItemCollection>)> = stream::iter(pages)
            .map(|page| async move { (page, self.fetch_page(page).await) })
            .buffer_unordered(self.batch_size())
            .collect()
            .await;

        results.sort_by_key(|(page, _)| *page);
        results.into_iter().map(|(_, result)| result).collect()
    }

    /// Enrich a whole collection over the bounded pool.
    async fn add_details_all(&self, items: ItemCollection) -> ItemCollection {
        if !self.parser.supports_details() {
            return items;
        }

        let name = items.name().to_string();
        let enriched: Vec<Item> = stream::iter(items.into_items())
            .map(|mut item| async move {
                self.add_details(&mut item).await;
                item
            })
            .buffer_unordered(self.batch_size())
            .collect()
            .await;

        let mut collection = ItemCollection::with_items(name, enriched);
        collection.sort_by_date();
        collection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{CarParser, ListingParser};

    fn consumer(parser: Arc<dyn PageParser>) -> PageConsumer {
        PageConsumer::new(parser, Arc::new(Config::default())).unwrap()
    }

    #[test]
    fn test_page_url_general() {
        let c = consumer(Arc::new(ListingParser::new("https://www.tori.fi").unwrap()));
        assert_eq!(c.page_url(3), "https://www.tori.fi/koko_suomi?&o=3");
    }

    #[test]
    fn test_page_url_cars() {
        let c = consumer(Arc::new(CarParser::new("https://www.tori.fi").unwrap()));
        assert_eq!(c.page_url(1), "https://www.tori.fi/koko_suomi/autot?&o=1");
    }
}
