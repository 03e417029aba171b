//! A System that keeps every cell and its tag index purely in memory

use crate::any_cell::AnyCell;
use crate::cleanup_worker::CleanupWorker;
use crate::managed::{AfterMutation, ManagedCell, ManagedCompressedCell};
use crate::traits::MemorySystem;
use dashmap::DashMap;
use memcell_cell::{Cell, CleanupStrategy, CompressedCell, CompressionAlgorithm, SizeHint};
use memcell_core::{CellId, Clock, Result, SystemClock, Tag};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use std::time::Duration;

pub struct InMemorySystem {
    cells: DashMap<CellId, Arc<dyn AnyCell>>,
    tag_index: RwLock<HashMap<Tag, HashSet<CellId>>>,
    strategies: RwLock<HashMap<String, CleanupStrategy>>,
    clock: Arc<dyn Clock>,
    cleanup: Mutex<Option<CleanupWorker>>,
}

impl InMemorySystem {
    pub fn new() -> Arc<Self> {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new(Self {
            cells: DashMap::new(),
            tag_index: RwLock::new(HashMap::new()),
            strategies: RwLock::new(HashMap::new()),
            clock,
            cleanup: Mutex::new(None),
        })
    }

    fn hook(self: &Arc<Self>) -> AfterMutation {
        let weak: Weak<InMemorySystem> = Arc::downgrade(self);
        Arc::new(move |id: CellId| {
            if let Some(system) = weak.upgrade() {
                system.resync_tag_index(id);
            }
        })
    }

    fn resync_tag_index(&self, id: CellId) {
        let tags = match self.cells.get(&id) {
            Some(cell) => cell.get_tags(),
            None => return,
        };
        let mut index = self.tag_index.write();
        for ids in index.values_mut() {
            ids.remove(&id);
        }
        index.retain(|_, ids| !ids.is_empty());
        for tag in tags {
            index.entry(tag).or_default().insert(id);
        }
    }

    pub fn create_cell<T: Clone + Send + Sync + 'static>(
        self: &Arc<Self>,
        initial: T,
    ) -> ManagedCell<T> {
        self.create_cell_full(initial, std::iter::empty(), None)
    }

    pub fn create_cell_with_tags<T: Clone + Send + Sync + 'static>(
        self: &Arc<Self>,
        initial: T,
        tags: impl IntoIterator<Item = Tag>,
    ) -> ManagedCell<T> {
        self.create_cell_full(initial, tags, None)
    }

    /// Like `create_cell`, but with an explicit size function so
    /// `metadata.size` (and therefore size-based cleanup) reflects the
    /// written value rather than the default best-effort `0`.
    pub fn create_cell_with_size_hint<T: Clone + Send + Sync + 'static>(
        self: &Arc<Self>,
        initial: T,
        size_hint: SizeHint<T>,
    ) -> ManagedCell<T> {
        self.create_cell_full(initial, std::iter::empty(), Some(size_hint))
    }

    pub fn create_cell_with_tags_and_size_hint<T: Clone + Send + Sync + 'static>(
        self: &Arc<Self>,
        initial: T,
        tags: impl IntoIterator<Item = Tag>,
        size_hint: SizeHint<T>,
    ) -> ManagedCell<T> {
        self.create_cell_full(initial, tags, Some(size_hint))
    }

    fn create_cell_full<T: Clone + Send + Sync + 'static>(
        self: &Arc<Self>,
        initial: T,
        tags: impl IntoIterator<Item = Tag>,
        size_hint: Option<SizeHint<T>>,
    ) -> ManagedCell<T> {
        let cell = Arc::new(Cell::with_size_hint(
            CellId::new(),
            initial,
            Arc::clone(&self.clock),
            size_hint,
        ));
        let id = cell.id();
        for tag in tags {
            cell.add_tag(tag);
        }
        self.cells
            .insert(id, Arc::clone(&cell) as Arc<dyn AnyCell>);
        self.resync_tag_index(id);
        ManagedCell::new(cell, self.hook())
    }

    pub fn create_compressed_cell<T: Clone + Send + Sync + 'static>(
        self: &Arc<Self>,
        initial: T,
        serialize: Arc<dyn Fn(&T) -> Vec<u8> + Send + Sync>,
        deserialize: Arc<dyn Fn(&[u8]) -> Result<T> + Send + Sync>,
        algorithm: CompressionAlgorithm,
        threshold: usize,
    ) -> Result<ManagedCompressedCell<T>> {
        let cell = Arc::new(CompressedCell::new(
            CellId::new(),
            initial,
            Arc::clone(&self.clock),
            serialize,
            deserialize,
            algorithm,
            threshold,
        )?);
        let id = cell.id();
        self.cells
            .insert(id, Arc::clone(&cell) as Arc<dyn AnyCell>);
        self.resync_tag_index(id);
        Ok(ManagedCompressedCell::new(cell, self.hook()))
    }
}

impl MemorySystem for InMemorySystem {
    fn get_cells_by_tag(&self, tag: &Tag) -> Vec<Arc<dyn AnyCell>> {
        let index = self.tag_index.read();
        match index.get(tag) {
            None => Vec::new(),
            Some(ids) => ids
                .iter()
                .filter_map(|id| self.cells.get(id).map(|c| Arc::clone(c.value())))
                .collect(),
        }
    }

    fn get_all_cells(&self) -> Vec<Arc<dyn AnyCell>> {
        self.cells.iter().map(|e| Arc::clone(e.value())).collect()
    }

    fn clear_all(&self) {
        for entry in self.cells.iter() {
            entry.value().empty();
        }
        self.tag_index.write().clear();
        let mut cleanup = self.cleanup.lock();
        if let Some(worker) = cleanup.as_mut() {
            worker.shutdown();
        }
        *cleanup = None;
    }

    fn register_cleanup_strategy(&self, name: String, strategy: CleanupStrategy) {
        self.strategies.write().insert(name, strategy);
    }

    fn unregister_cleanup_strategy(&self, name: &str) {
        self.strategies.write().remove(name);
    }

    fn get_cleanup_strategies(&self) -> Vec<(String, CleanupStrategy)> {
        self.strategies
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn run_cleanup(&self) -> usize {
        let strategies = self.strategies.read();
        if strategies.is_empty() {
            return 0;
        }
        let now = self.clock.now();
        let mut emptied = 0;
        for entry in self.cells.iter() {
            let metadata = entry.value().metadata();
            if strategies.values().any(|s| s.matches(&metadata, now)) {
                entry.value().empty();
                emptied += 1;
            }
        }
        tracing::info!(emptied, "cleanup pass complete");
        emptied
    }

    fn run_cleanup_named(&self, name: &str) -> usize {
        let strategies = self.strategies.read();
        let strategy = match strategies.get(name) {
            Some(s) => s,
            None => return 0,
        };
        let now = self.clock.now();
        let mut emptied = 0;
        for entry in self.cells.iter() {
            if strategy.matches(&entry.value().metadata(), now) {
                entry.value().empty();
                emptied += 1;
            }
        }
        tracing::info!(emptied, strategy = name, "named cleanup pass complete");
        emptied
    }

    fn disable_automatic_cleanup(&self) {
        let mut cleanup = self.cleanup.lock();
        if let Some(worker) = cleanup.as_mut() {
            worker.shutdown();
        }
        *cleanup = None;
    }

    fn total_size(&self) -> usize {
        self.cells.iter().map(|e| e.value().metadata().size).sum()
    }

    fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

impl InMemorySystem {
    /// Start the scheduled cleanup background thread. Needs an `Arc<Self>`
    /// receiver (unlike the `MemorySystem::enable_automatic_cleanup` trait
    /// method) because the worker holds a `Weak<dyn MemorySystem>` back to
    /// this System.
    pub fn enable_scheduled_cleanup(self: &Arc<Self>, interval: Duration) {
        let mut cleanup = self.cleanup.lock();
        if let Some(worker) = cleanup.as_mut() {
            worker.shutdown();
        }
        let weak: Weak<dyn MemorySystem> = Arc::downgrade(self) as Weak<dyn MemorySystem>;
        *cleanup = Some(CleanupWorker::spawn(weak, interval));
    }

    /// Convenience constructor: registers a `TimeBasedAccess` strategy under
    /// the name `"time_based_access"` and immediately enables automatic
    /// cleanup at `check_interval`. A shortcut over
    /// `register_cleanup_strategy` + `enable_scheduled_cleanup`, not a new
    /// primitive in the cleanup algebra.
    pub fn with_time_based_cleanup(max_idle: Duration, check_interval: Duration) -> Arc<Self> {
        let system = Self::new();
        system.register_cleanup_strategy(
            "time_based_access".to_string(),
            CleanupStrategy::TimeBasedAccess { max_idle },
        );
        system.enable_scheduled_cleanup(check_interval);
        system
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memcell_core::FakeClock;
    use std::time::Duration;

    #[test]
    fn cells_are_retrievable_by_tag() {
        let system = InMemorySystem::new();
        let a = system.create_cell_with_tags(1_i32, vec![Tag::new("x")]);
        let _b = system.create_cell_with_tags(2_i32, vec![Tag::new("y")]);
        let found = system.get_cells_by_tag(&Tag::new("x"));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), a.id());
    }

    #[test]
    fn tag_index_resyncs_after_tag_removal() {
        let system = InMemorySystem::new();
        let cell = system.create_cell_with_tags(1_i32, vec![Tag::new("x")]);
        cell.remove_tag(&Tag::new("x"));
        assert!(system.get_cells_by_tag(&Tag::new("x")).is_empty());
    }

    #[test]
    fn run_cleanup_empties_matching_cells_without_unregistering_them() {
        let clock = Arc::new(FakeClock::new());
        let system = InMemorySystem::with_clock(clock.clone());
        let cell = system.create_cell(42_i32);
        system.register_cleanup_strategy(
            "idle".to_string(),
            CleanupStrategy::TimeBasedAccess {
                max_idle: Duration::from_secs(1),
            },
        );
        clock.advance(Duration::from_secs(2));
        let emptied = system.run_cleanup();
        assert_eq!(emptied, 1);
        assert_eq!(cell.read(), None);
        assert_eq!(system.cell_count(), 1);
    }

    #[test]
    fn run_cleanup_with_no_strategies_empties_nothing() {
        let system = InMemorySystem::new();
        system.create_cell(1_i32);
        assert_eq!(system.run_cleanup(), 0);
    }

    #[test]
    fn clear_all_empties_every_cell() {
        let system = InMemorySystem::new();
        let a = system.create_cell(1_i32);
        let b = system.create_cell(2_i32);
        system.clear_all();
        assert_eq!(a.read(), None);
        assert_eq!(b.read(), None);
    }

    #[test]
    fn clear_all_drops_the_tag_index() {
        let system = InMemorySystem::new();
        system.create_cell_with_tags(1_i32, vec![Tag::new("x")]);
        system.clear_all();
        assert!(system.get_cells_by_tag(&Tag::new("x")).is_empty());
    }

    #[test]
    fn with_time_based_cleanup_registers_strategy_and_starts_worker() {
        let system = InMemorySystem::with_time_based_cleanup(
            Duration::from_secs(60),
            Duration::from_millis(10),
        );
        assert_eq!(system.get_cleanup_strategies().len(), 1);
        assert!(system.cleanup.lock().is_some());
    }

    #[test]
    fn clear_all_disables_scheduled_cleanup() {
        let system = InMemorySystem::new();
        system.enable_scheduled_cleanup(Duration::from_millis(10));
        system.clear_all();
        assert!(system.cleanup.lock().is_none());
    }
}
