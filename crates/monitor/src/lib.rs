//! Usage monitoring across one or more memory Systems

mod metrics;
mod monitor;
mod worker;

pub use metrics::{MetricsSnapshot, DEFAULT_HISTORY_CAPACITY};
pub use monitor::Monitor;
