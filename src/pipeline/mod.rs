//! Pipeline entry points for monitor operations.
//!
//! - `run_monitor`: scan all topics forever with jittered sleeps
//! - `run_scan`: one cycle per topic, for cron-style invocation

pub mod alarms;
pub mod scan;

pub use alarms::AlarmEngine;
pub use scan::{CycleSummary, TopicScanner, build_scanners, run_monitor, run_scan};
