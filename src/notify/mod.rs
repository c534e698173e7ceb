//! Notification dispatch port.
//!
//! Alarm matches go out through a `Notifier`. Delivery is fire-and-forget:
//! a transport failure is logged and swallowed, it never fails the cycle.
//! The real email transport lives outside this crate; the bundled
//! implementation just logs what would have been sent.

use std::path::Path;

use async_trait::async_trait;

/// Outbound notification transport.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send one notification. Must not propagate transport errors.
    async fn send(&self, to: &str, subject: &str, body: &str, attachment: Option<&Path>);
}

/// Notifier that writes every message to the log.
///
/// Stands in when no mail transport is configured, and doubles as the
/// development default.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str, attachment: Option<&Path>) {
        log::info!("notify {}: {} ({})", to, subject, body);
        if let Some(path) = attachment {
            log::debug!("notification attachment: {:?}", path);
        }
    }
}
