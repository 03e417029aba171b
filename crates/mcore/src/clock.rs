//! Clock abstraction
//!
//! The cell and system crates never call `Timestamp::now()` directly;
//! every time-sensitive operation goes through a `Clock` so that cleanup
//! and monitoring behavior can be tested deterministically (see
//! `FakeClock` below) instead of relying on real sleeps.

use crate::timestamp::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Supplies the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// The real clock, backed by the system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A manually-advanceable clock for tests.
///
/// Starts at the real current time and only moves forward when `advance`
/// is called, so time-based cleanup and expiry tests are exact rather than
/// timing-dependent.
#[derive(Debug, Clone)]
pub struct FakeClock {
    epoch: Timestamp,
    elapsed_micros: Arc<AtomicU64>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            epoch: Timestamp::now(),
            elapsed_micros: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Move the clock forward by `d`.
    pub fn advance(&self, d: Duration) {
        self.elapsed_micros
            .fetch_add(d.as_micros() as u64, Ordering::SeqCst);
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Timestamp {
        self.epoch
            .saturating_add(Duration::from_micros(self.elapsed_micros.load(Ordering::SeqCst)))
    }
}
