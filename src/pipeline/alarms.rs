//! Alarm matching engine.
//!
//! Evaluates every new item against all saved-search rules and dispatches
//! notifications through the notifier port. A per-pass ledger guarantees
//! at most one notification per (item, rule-owner) pair; across cycles the
//! baseline diff provides the dedup, so a retention-evicted item that
//! reappears may legitimately alarm again.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::Result;
use crate::models::{CompiledRule, Item, ItemCollection};
use crate::notify::Notifier;
use crate::storage::ItemStore;

/// Item id -> users already notified for it in this pass.
type Ledger = HashMap<u64, HashSet<u32>>;

/// Evaluates alarm rules against newly discovered items.
pub struct AlarmEngine {
    store: Arc<dyn ItemStore>,
    notifier: Arc<dyn Notifier>,
}

fn price_text(item: &Item) -> String {
    item.price
        .map_or_else(|| "n/a".to_string(), |p| p.to_string())
}

impl AlarmEngine {
    pub fn new(store: Arc<dyn ItemStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Run one evaluation pass over a collection of new items.
    ///
    /// Returns the number of notifications dispatched. Invalid rule
    /// regexes are skipped with a warning rather than failing the pass.
    pub async fn evaluate(&self, items: &ItemCollection) -> Result<usize> {
        if items.is_empty() {
            return Ok(0);
        }

        let rules = self.store.get_alarms().await?;
        if rules.is_empty() {
            return Ok(0);
        }

        let compiled: Vec<CompiledRule> = rules
            .into_iter()
            .filter_map(|rule| match CompiledRule::compile(rule.clone()) {
                Ok(compiled) => Some(compiled),
                Err(e) => {
                    log::warn!("skipping alarm {} with invalid pattern: {}", rule.id, e);
                    None
                }
            })
            .collect();
        log::debug!("evaluating {} items against {} alarms", items.len(), compiled.len());

        let mut ledger = Ledger::new();
        let mut dispatched = 0;

        for item in items {
            for rule in &compiled {
                if !rule.matches(item) {
                    continue;
                }

                let user_id = rule.rule.user_id;
                let already_sent = ledger
                    .get(&item.id)
                    .is_some_and(|users| users.contains(&user_id));
                if already_sent {
                    log::info!(
                        "alarm already sent to user {} for \"{}, {} eur\"",
                        user_id,
                        item.description,
                        price_text(item)
                    );
                    continue;
                }

                self.dispatch(item, user_id, &mut dispatched).await;
                ledger.entry(item.id).or_default().insert(user_id);
            }
        }

        Ok(dispatched)
    }

    /// Resolve the owner's address and send, recording the audit entry.
    ///
    /// A rule match without a resolvable address is logged but not sent.
    async fn dispatch(&self, item: &Item, user_id: u32, dispatched: &mut usize) {
        let email = match self.store.get_user_email(user_id).await {
            Ok(email) => email,
            Err(e) => {
                log::warn!("address lookup failed for user {}: {}", user_id, e);
                None
            }
        };

        match email {
            Some(email) => {
                log::info!(
                    "alarm {} for \"{}, {} eur\"",
                    email,
                    item.description,
                    price_text(item)
                );
                let subject = format!("Tori.fi: {}, {}", item.description, price_text(item));
                self.notifier.send(&email, &subject, &item.url, None).await;
                *dispatched += 1;

                if let Err(e) = self.store.store_item_alarm(user_id, item).await {
                    log::warn!("failed to record alarm for user {}: {}", user_id, e);
                }
            }
            None => {
                log::info!(
                    "alarm found \"{}, {} eur\"",
                    item.description,
                    price_text(item)
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlarmRule, TradeKind};
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::path::Path;
    use std::sync::Mutex;

    struct FakeStore {
        alarms: Vec<AlarmRule>,
        users: HashMap<u32, String>,
        audit: Mutex<Vec<u32>>,
    }

    #[async_trait]
    impl ItemStore for FakeStore {
        async fn get_items(
            &self,
            _range: Option<(NaiveDateTime, NaiveDateTime)>,
        ) -> Result<Vec<Item>> {
            Ok(Vec::new())
        }

        async fn store_items(&self, _items: &[Item]) -> Result<()> {
            Ok(())
        }

        async fn get_cars(&self) -> Result<Vec<Item>> {
            Ok(Vec::new())
        }

        async fn store_cars(&self, _items: &[Item]) -> Result<()> {
            Ok(())
        }

        async fn get_alarms(&self) -> Result<Vec<AlarmRule>> {
            Ok(self.alarms.clone())
        }

        async fn get_user_email(&self, user_id: u32) -> Result<Option<String>> {
            Ok(self.users.get(&user_id).cloned())
        }

        async fn store_item_alarm(&self, user_id: u32, _item: &Item) -> Result<()> {
            self.audit.lock().unwrap().push(user_id);
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingNotifier {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Notifier for CountingNotifier {
        async fn send(&self, to: &str, subject: &str, _body: &str, _attachment: Option<&Path>) {
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), subject.to_string()));
        }
    }

    fn sofa(id: u64, price: Option<u32>) -> Item {
        Item {
            id,
            description: "Sofa for sale".to_string(),
            price,
            date: NaiveDate::from_ymd_opt(2024, 3, 5)
                .unwrap()
                .and_hms_opt(14, 30, 0)
                .unwrap(),
            location: "Uusimaa".to_string(),
            category: "Sisustus ja huonekalut".to_string(),
            url: format!("https://www.tori.fi/sofa_{}.htm", id),
            image_url: None,
            trade_kind: TradeKind::Sell,
            car: None,
        }
    }

    fn rule(id: u32, user_id: u32, pattern: &str, max_price: Option<u32>) -> AlarmRule {
        AlarmRule {
            id,
            user_id,
            pattern: Some(pattern.to_string()),
            location: None,
            max_price,
            min_price: None,
        }
    }

    fn engine(store: FakeStore, notifier: Arc<CountingNotifier>) -> AlarmEngine {
        AlarmEngine::new(Arc::new(store), notifier)
    }

    #[tokio::test]
    async fn test_matching_rule_dispatches() {
        let store = FakeStore {
            alarms: vec![rule(1, 7, "sofa", Some(500))],
            users: HashMap::from([(7, "a@example.com".to_string())]),
            audit: Mutex::new(Vec::new()),
        };
        let notifier = Arc::new(CountingNotifier::default());
        let engine = engine(store, notifier.clone());

        let items = ItemCollection::with_items("new", vec![sofa(1, Some(499))]);
        let count = engine.evaluate(&items).await.unwrap();

        assert_eq!(count, 1);
        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "a@example.com");
        assert_eq!(sent[0].1, "Tori.fi: Sofa for sale, 499");
    }

    #[tokio::test]
    async fn test_price_at_ceiling_does_not_fire() {
        let store = FakeStore {
            alarms: vec![rule(1, 7, "sofa", Some(500))],
            users: HashMap::from([(7, "a@example.com".to_string())]),
            audit: Mutex::new(Vec::new()),
        };
        let notifier = Arc::new(CountingNotifier::default());
        let engine = engine(store, notifier.clone());

        let items = ItemCollection::with_items("new", vec![sofa(1, Some(500))]);
        assert_eq!(engine.evaluate(&items).await.unwrap(), 0);
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_two_rules_same_owner_notify_once() {
        let store = FakeStore {
            alarms: vec![rule(1, 7, "sofa", None), rule(2, 7, "sof", None)],
            users: HashMap::from([(7, "a@example.com".to_string())]),
            audit: Mutex::new(Vec::new()),
        };
        let notifier = Arc::new(CountingNotifier::default());
        let engine = engine(store, notifier.clone());

        let items = ItemCollection::with_items("new", vec![sofa(1, Some(100))]);
        assert_eq!(engine.evaluate(&items).await.unwrap(), 1);
        assert_eq!(notifier.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_different_owners_each_notified() {
        let store = FakeStore {
            alarms: vec![rule(1, 7, "sofa", None), rule(2, 8, "sofa", None)],
            users: HashMap::from([
                (7, "a@example.com".to_string()),
                (8, "b@example.com".to_string()),
            ]),
            audit: Mutex::new(Vec::new()),
        };
        let notifier = Arc::new(CountingNotifier::default());
        let engine = engine(store, notifier.clone());

        let items = ItemCollection::with_items("new", vec![sofa(1, Some(100))]);
        assert_eq!(engine.evaluate(&items).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_match_without_address_is_logged_not_sent() {
        let store = FakeStore {
            alarms: vec![rule(1, 9, "sofa", None)],
            users: HashMap::new(),
            audit: Mutex::new(Vec::new()),
        };
        let notifier = Arc::new(CountingNotifier::default());
        let engine = engine(store, notifier.clone());

        let items = ItemCollection::with_items("new", vec![sofa(1, Some(100))]);
        assert_eq!(engine.evaluate(&items).await.unwrap(), 0);
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_audit_written_on_dispatch() {
        let store = FakeStore {
            alarms: vec![rule(1, 7, "sofa", None)],
            users: HashMap::from([(7, "a@example.com".to_string())]),
            audit: Mutex::new(Vec::new()),
        };
        let audit_handle = Arc::new(store);
        let notifier = Arc::new(CountingNotifier::default());
        let engine = AlarmEngine::new(audit_handle.clone(), notifier);

        let items = ItemCollection::with_items("new", vec![sofa(1, Some(100))]);
        engine.evaluate(&items).await.unwrap();
        assert_eq!(*audit_handle.audit.lock().unwrap(), vec![7]);
    }

    #[tokio::test]
    async fn test_invalid_rule_regex_is_skipped() {
        let store = FakeStore {
            alarms: vec![
                AlarmRule {
                    id: 1,
                    user_id: 7,
                    pattern: Some("(broken".to_string()),
                    location: None,
                    max_price: None,
                    min_price: None,
                },
                rule(2, 7, "sofa", None),
            ],
            users: HashMap::from([(7, "a@example.com".to_string())]),
            audit: Mutex::new(Vec::new()),
        };
        let notifier = Arc::new(CountingNotifier::default());
        let engine = engine(store, notifier.clone());

        let items = ItemCollection::with_items("new", vec![sofa(1, Some(100))]);
        assert_eq!(engine.evaluate(&items).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_inputs_are_noops() {
        let store = FakeStore {
            alarms: Vec::new(),
            users: HashMap::new(),
            audit: Mutex::new(Vec::new()),
        };
        let notifier = Arc::new(CountingNotifier::default());
        let engine = engine(store, notifier.clone());

        let empty = ItemCollection::new("new");
        assert_eq!(engine.evaluate(&empty).await.unwrap(), 0);

        let items = ItemCollection::with_items("new", vec![sofa(1, Some(100))]);
        assert_eq!(engine.evaluate(&items).await.unwrap(), 0);
    }
}
