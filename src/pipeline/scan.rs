//! Scan loop and per-topic change detection.
//!
//! Each topic owns a `TopicScanner`: the known-items baseline plus the
//! page consumer for that topic. One cycle walks the paginated index,
//! diffs every page against the baseline, enriches and persists the new
//! items, and hands them to the alarm engine. `run_monitor` drives all
//! topics forever with a jittered sleep between cycles.

use std::sync::Arc;
use std::time::Duration;

use crate::consumer::{PageConsumer, PageSource};
use crate::error::Result;
use crate::models::{Config, ItemCollection, Topic};
use crate::notify::Notifier;
use crate::parser::{CarParser, ListingParser, PageParser};
use crate::pipeline::AlarmEngine;
use crate::storage::ItemStore;

/// Counters reported after one topic cycle.
#[derive(Debug, Clone, Copy)]
pub struct CycleSummary {
    /// New items discovered this cycle
    pub added: usize,
    /// Baseline size after retention truncation
    pub baseline_size: usize,
}

/// Per-topic scan state: the baseline is owned here and nowhere else.
pub struct TopicScanner {
    topic: Topic,
    source: Arc<dyn PageSource>,
    baseline: ItemCollection,
    config: Arc<Config>,
    store: Arc<dyn ItemStore>,
}

impl TopicScanner {
    /// Create a scanner and load its baseline from the store.
    ///
    /// A failed load degrades to an empty baseline; the next cycle will
    /// treat everything as new, which persistence dedups.
    pub async fn init(
        parser: Arc<dyn PageParser>,
        config: Arc<Config>,
        store: Arc<dyn ItemStore>,
    ) -> Result<Self> {
        let topic = parser.topic();
        let source = Arc::new(PageConsumer::new(parser, config.clone())?);
        Self::from_source(topic, source, config, store).await
    }

    async fn from_source(
        topic: Topic,
        source: Arc<dyn PageSource>,
        config: Arc<Config>,
        store: Arc<dyn ItemStore>,
    ) -> Result<Self> {
        let persisted = match topic {
            Topic::General => store.get_items(None).await,
            Topic::Cars => store.get_cars().await,
        };
        let items = persisted.unwrap_or_else(|e| {
            log::warn!("baseline load failed for topic={}: {}", topic.name(), e);
            Vec::new()
        });

        let mut baseline = ItemCollection::with_items("old", items);
        baseline.truncate_to_newest(config.scraper.keep_items);
        log::info!(
            "startup topic={}, {} items, {}",
            topic.name(),
            baseline.len(),
            baseline.date_range_text()
        );

        Ok(Self {
            topic,
            source,
            baseline,
            config,
            store,
        })
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    pub fn baseline(&self) -> &ItemCollection {
        &self.baseline
    }

    /// Walk the paginated index and accumulate items not yet in the
    /// baseline.
    ///
    /// Pages are fetched in bounded-concurrency batches. Once enough
    /// pages yield nothing new the scan has reached already-seen
    /// territory and stops; that is the normal exit, not an error.
    async fn collect_new_items(&mut self) -> Result<ItemCollection> {
        let mut new_items = ItemCollection::new("new");
        let stale_limit = self.config.monitor.stale_page_limit;
        let delay = Duration::from_millis(self.config.scraper.request_delay_ms);
        let max_pages = self.source.max_pages();

        let mut stale_pages = 0usize;
        let mut page = 1usize;

        'scan: while page <= max_pages {
            let batch_end = (page + self.source.batch_size() - 1).min(max_pages);
            let batch = self.source.fetch_batch(page..=batch_end).await;

            for result in batch {
                let page_items = result?;
                let diff = page_items.diff_against(&self.baseline);

                if diff.is_empty() {
                    stale_pages += 1;
                    if stale_pages > stale_limit {
                        break 'scan;
                    }
                    continue;
                }

                self.baseline.merge(diff.clone());
                new_items.merge(diff);
            }

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            page = batch_end + 1;
        }

        new_items.sort_by_date();
        Ok(new_items)
    }

    /// Run one full cycle: scan, diff, enrich, persist, alarm.
    pub async fn run_cycle(&mut self, engine: &AlarmEngine) -> Result<CycleSummary> {
        let new_items = self.collect_new_items().await?;
        let new_items = self.source.add_details_all(new_items).await;

        self.baseline
            .truncate_to_newest(self.config.scraper.keep_items);

        // Storage failures keep the cycle alive on in-memory state.
        let persisted = match self.topic {
            Topic::General => self.store.store_items(new_items.items()).await,
            Topic::Cars => self.store.store_cars(new_items.items()).await,
        };
        if let Err(e) = persisted {
            log::warn!("persist failed for topic={}: {}", self.topic.name(), e);
        }

        match engine.evaluate(&new_items).await {
            Ok(count) if count > 0 => {
                log::info!("dispatched {} alarm notifications", count)
            }
            Ok(_) => {}
            Err(e) => log::warn!("alarm evaluation failed: {}", e),
        }

        let summary = CycleSummary {
            added: new_items.len(),
            baseline_size: self.baseline.len(),
        };
        log::info!(
            "topic={}, {}/{} items ({} added), {}",
            self.topic.name(),
            summary.baseline_size,
            self.config.scraper.keep_items,
            summary.added,
            self.baseline.date_range_text()
        );
        Ok(summary)
    }
}

/// Build one scanner per enabled topic.
pub async fn build_scanners(
    config: Arc<Config>,
    store: Arc<dyn ItemStore>,
) -> Result<Vec<TopicScanner>> {
    let mut parsers: Vec<Arc<dyn PageParser>> = Vec::new();
    if config.topics.cars {
        parsers.push(Arc::new(CarParser::new(&config.scraper.base_url)?));
    }
    if config.topics.general {
        parsers.push(Arc::new(ListingParser::new(&config.scraper.base_url)?));
    }

    let mut scanners = Vec::new();
    for parser in parsers {
        scanners.push(TopicScanner::init(parser, config.clone(), store.clone()).await?);
    }
    Ok(scanners)
}

/// Run one cycle for every topic. A failing topic is logged and skipped
/// so the others still complete.
pub async fn run_all_cycles(scanners: &mut [TopicScanner], engine: &AlarmEngine) {
    for scanner in scanners.iter_mut() {
        if let Err(e) = scanner.run_cycle(engine).await {
            log::error!("cycle failed for topic={}: {}", scanner.topic().name(), e);
        }
    }
}

/// Sleep interval before the next cycle: base delay plus random jitter,
/// so polling never settles into a fixed cadence.
fn cycle_wait(config: &Config) -> Duration {
    let jitter = match config.monitor.jitter_max_secs {
        0 => 0,
        max => fastrand::u64(1..=max),
    };
    Duration::from_secs(config.monitor.base_delay_secs + jitter)
}

/// Run one scan cycle per topic and return.
pub async fn run_scan(
    config: Arc<Config>,
    store: Arc<dyn ItemStore>,
    notifier: Arc<dyn Notifier>,
) -> Result<()> {
    let engine = AlarmEngine::new(store.clone(), notifier);
    let mut scanners = build_scanners(config, store).await?;
    run_all_cycles(&mut scanners, &engine).await;
    Ok(())
}

/// Monitor all enabled topics until interrupted.
pub async fn run_monitor(
    config: Arc<Config>,
    store: Arc<dyn ItemStore>,
    notifier: Arc<dyn Notifier>,
) -> Result<()> {
    log::info!("start tori.fi monitoring");

    let engine = AlarmEngine::new(store.clone(), notifier);
    let mut scanners = build_scanners(config.clone(), store).await?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("interrupt received, stopping monitor");
                return Ok(());
            }
            _ = run_all_cycles(&mut scanners, &engine) => {}
        }

        let wait = cycle_wait(&config);
        log::debug!("sleeping {} s until next cycle", wait.as_secs());
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("interrupt received, stopping monitor");
                return Ok(());
            }
            _ = tokio::time::sleep(wait) => {}
        }
    }
}
