//! Aggregate usage monitoring across one or more Systems

use crate::metrics::{History, MetricsSnapshot, DEFAULT_HISTORY_CAPACITY};
use crate::worker::CollectionWorker;
use memcell_core::{Clock, SystemClock, Timestamp};
use memcell_system::MemorySystem;
use parking_lot::{Mutex, RwLock};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Watches one or more Systems without owning them, or being owned by them:
/// holds only `Weak<dyn MemorySystem>`, so a dropped System is simply
/// skipped on the next `get_metrics` call rather than kept alive.
pub struct Monitor {
    systems: RwLock<Vec<Weak<dyn MemorySystem>>>,
    history: Mutex<History>,
    size_threshold: RwLock<Option<usize>>,
    count_threshold: RwLock<Option<usize>>,
    clock: Arc<dyn Clock>,
    collection: Mutex<Option<CollectionWorker>>,
}

impl Monitor {
    pub fn new() -> Arc<Self> {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Arc<Self> {
        Self::with_clock_and_capacity(clock, DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_clock_and_capacity(clock: Arc<dyn Clock>, history_capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            systems: RwLock::new(Vec::new()),
            history: Mutex::new(History::new(history_capacity)),
            size_threshold: RwLock::new(None),
            count_threshold: RwLock::new(None),
            clock,
            collection: Mutex::new(None),
        })
    }

    pub fn register_memory_system(&self, system: Weak<dyn MemorySystem>) {
        self.systems.write().push(system);
    }

    /// Drops every registered weak reference that points at `system`, and
    /// opportunistically prunes any that have already gone dead.
    pub fn unregister_memory_system(&self, system: &Weak<dyn MemorySystem>) {
        self.systems
            .write()
            .retain(|w| w.upgrade().is_some() && !Weak::ptr_eq(w, system));
    }

    pub fn set_size_threshold(&self, threshold: Option<usize>) {
        *self.size_threshold.write() = threshold;
    }

    pub fn set_count_threshold(&self, threshold: Option<usize>) {
        *self.count_threshold.write() = threshold;
    }

    /// Poll every live registered System, aggregate size/count/tag metrics
    /// across every cell, record the snapshot in history, and log a warning
    /// for any exceeded threshold. Different Systems (and different cells
    /// within a System) may be observed at slightly different instants —
    /// the only guarantee is that each cell's own metadata is read once.
    pub fn get_metrics(&self) -> MetricsSnapshot {
        let systems = self.systems.read();
        let mut sizes = Vec::new();
        let mut tags_per_cell = Vec::new();
        for system in systems.iter() {
            if let Some(system) = system.upgrade() {
                for cell in system.get_all_cells() {
                    let metadata = cell.metadata();
                    sizes.push(metadata.size);
                    tags_per_cell.push(cell.get_tags());
                }
            }
        }
        drop(systems);

        let snapshot =
            MetricsSnapshot::from_sizes_and_tags(self.clock.now(), &sizes, &tags_per_cell);

        if let Some(threshold) = *self.size_threshold.read() {
            if snapshot.total_size > threshold {
                tracing::warn!(
                    total_size = snapshot.total_size,
                    threshold,
                    "memory size threshold exceeded"
                );
            }
        }
        if let Some(threshold) = *self.count_threshold.read() {
            if snapshot.total_cells > threshold {
                tracing::warn!(
                    total_cells = snapshot.total_cells,
                    threshold,
                    "memory cell count threshold exceeded"
                );
            }
        }

        self.history.lock().push(snapshot.clone());
        snapshot
    }

    pub fn get_historical_metrics(&self, from: Timestamp, to: Timestamp) -> Vec<MetricsSnapshot> {
        self.history.lock().range(from, to)
    }

    /// Installs a periodic background sampler, replacing any prior one.
    /// Takes an immediate first sample synchronously so a caller's very next
    /// `get_historical_metrics` call is never empty.
    pub fn enable_periodic_collection(self: &Arc<Self>, interval: Duration) {
        let mut collection = self.collection.lock();
        if let Some(worker) = collection.as_mut() {
            worker.shutdown();
        }
        self.get_metrics();
        let weak = Arc::downgrade(self);
        *collection = Some(CollectionWorker::spawn(weak, interval));
    }

    pub fn disable_periodic_collection(&self) {
        let mut collection = self.collection.lock();
        if let Some(worker) = collection.as_mut() {
            worker.shutdown();
        }
        *collection = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memcell_core::FakeClock;
    use memcell_system::InMemorySystem;
    use std::sync::Arc;

    #[test]
    fn get_metrics_sums_across_registered_systems() {
        let monitor = Monitor::new();
        let sys_a = InMemorySystem::new();
        let sys_b = InMemorySystem::new();
        sys_a.create_cell_with_tags("x".repeat(10), Vec::<memcell_core::Tag>::new());
        sys_b.create_cell_with_tags("y".repeat(10), Vec::<memcell_core::Tag>::new());

        monitor.register_memory_system(Arc::downgrade(&sys_a) as Weak<dyn MemorySystem>);
        monitor.register_memory_system(Arc::downgrade(&sys_b) as Weak<dyn MemorySystem>);

        let snapshot = monitor.get_metrics();
        assert_eq!(snapshot.total_cells, 2);
    }

    #[test]
    fn dropped_system_is_skipped_not_kept_alive() {
        let monitor = Monitor::new();
        {
            let sys = InMemorySystem::new();
            sys.create_cell_with_tags(1_i32, Vec::<memcell_core::Tag>::new());
            monitor.register_memory_system(Arc::downgrade(&sys) as Weak<dyn MemorySystem>);
        }
        let snapshot = monitor.get_metrics();
        assert_eq!(snapshot.total_cells, 0);
    }

    #[test]
    fn history_is_queryable_by_time_range() {
        let clock = Arc::new(FakeClock::new());
        let monitor = Monitor::with_clock(clock.clone());
        let t0 = monitor.get_metrics().timestamp;
        clock.advance(std::time::Duration::from_secs(10));
        let t1 = monitor.get_metrics().timestamp;

        let all = monitor.get_historical_metrics(t0, t1);
        assert_eq!(all.len(), 2);
        let only_first = monitor.get_historical_metrics(t0, t0);
        assert_eq!(only_first.len(), 1);
    }
}
