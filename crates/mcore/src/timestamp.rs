//! Microsecond-precision, serializable instant type
//!
//! Cell metadata (`created_at`, `last_accessed`, `last_modified`) must
//! survive a process restart when a cell is persisted, so plain
//! `std::time::Instant` (which is only meaningful within one process) won't
//! do. `Timestamp` stores microseconds since the Unix epoch instead, which
//! is both comparable/orderable like an instant and `Serialize`/`Deserialize`
//! for the on-disk record.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A point in time, expressed as microseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Timestamp for the current moment, per the wall clock.
    ///
    /// Falls back to `EPOCH` if the system clock is set before 1970 (e.g. a
    /// misconfigured NTP client) rather than panicking.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp(duration.as_micros() as u64)
    }

    pub const fn from_micros(micros: u64) -> Self {
        Timestamp(micros)
    }

    pub const fn as_micros(&self) -> u64 {
        self.0
    }

    /// Duration elapsed since `earlier`, or `None` if `earlier` is later than `self`.
    pub fn duration_since(&self, earlier: Timestamp) -> Option<Duration> {
        if self.0 >= earlier.0 {
            Some(Duration::from_micros(self.0 - earlier.0))
        } else {
            None
        }
    }

    /// Saturating forward shift, used by `FakeClock::advance`.
    pub fn saturating_add(&self, duration: Duration) -> Self {
        Timestamp(self.0.saturating_add(duration.as_micros() as u64))
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::EPOCH
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let secs = self.0 / 1_000_000;
        let micros = self.0 % 1_000_000;
        write!(f, "{}.{:06}", secs, micros)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_since_orders_correctly() {
        let t1 = Timestamp::from_micros(1000);
        let t2 = Timestamp::from_micros(3000);
        assert_eq!(t2.duration_since(t1).unwrap(), Duration::from_micros(2000));
        assert!(t1.duration_since(t2).is_none());
    }

    #[test]
    fn now_advances() {
        let before = Timestamp::now();
        std::thread::sleep(Duration::from_millis(1));
        let after = Timestamp::now();
        assert!(after > before);
    }

    #[test]
    fn serializes_round_trip() {
        let ts = Timestamp::from_micros(1_234_567);
        let json = serde_json::to_string(&ts).unwrap();
        let restored: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(ts, restored);
    }
}
