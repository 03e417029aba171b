//! A System that durably persists every cell to one record file per cell
//!
//! Each cell lives at `<base_dir>/<cell-id>.cell`, a `bincode`-encoded
//! `CellRecord`. Writes go to `<cell-id>.cell.tmp` then `rename()` over the
//! final path, a temp-file-plus-rename pattern for crash-safe durability.

use crate::any_cell::AnyCell;
use crate::cleanup_worker::CleanupWorker;
use crate::managed::{AfterMutation, ManagedCell};
use crate::traits::MemorySystem;
use dashmap::DashMap;
use memcell_cell::{Cell, CleanupStrategy};
use memcell_core::{CellId, Clock, Error, Metadata, Result, SystemClock, Tag};
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize)]
struct CellRecord {
    value: Option<Vec<u8>>,
    initial_value: Vec<u8>,
    metadata: Metadata,
}

type Writer = Arc<dyn Fn() -> Result<()> + Send + Sync>;

pub struct PersistentSystem {
    base_dir: PathBuf,
    cells: DashMap<CellId, Arc<dyn AnyCell>>,
    /// Cells loaded from disk at `open()` time but not yet claimed by a
    /// typed `open_cell::<T>()` call. Removed once claimed.
    raw_records: DashMap<CellId, Arc<RawBytesCell>>,
    writers: DashMap<CellId, Writer>,
    tag_index: RwLock<HashMap<Tag, HashSet<CellId>>>,
    strategies: RwLock<HashMap<String, CleanupStrategy>>,
    clock: Arc<dyn Clock>,
    cleanup: Mutex<Option<CleanupWorker>>,
}

fn record_path(base_dir: &Path, id: CellId) -> PathBuf {
    base_dir.join(format!("{id}.cell"))
}

fn write_record_atomic(path: &Path, record: &CellRecord) -> Result<()> {
    let tmp_path = path.with_extension("cell.tmp");
    let bytes =
        bincode::serialize(record).map_err(|e| Error::PersistenceError(e.to_string()))?;
    fs::write(&tmp_path, &bytes)?;
    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        Error::PersistenceError(e.to_string())
    })?;
    Ok(())
}

impl PersistentSystem {
    /// Open (creating if absent) `base_dir`, loading every `*.cell` record
    /// found there. A record that fails to decode is logged and skipped;
    /// the System still starts with everything that did load.
    pub fn open(base_dir: impl Into<PathBuf>) -> Result<Arc<Self>> {
        Self::open_with_clock(base_dir, Arc::new(SystemClock))
    }

    pub fn open_with_clock(base_dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Result<Arc<Self>> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;

        let system = Arc::new(Self {
            base_dir: base_dir.clone(),
            cells: DashMap::new(),
            raw_records: DashMap::new(),
            writers: DashMap::new(),
            tag_index: RwLock::new(HashMap::new()),
            strategies: RwLock::new(HashMap::new()),
            clock,
            cleanup: Mutex::new(None),
        });

        for entry in fs::read_dir(&base_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("cell") {
                continue;
            }
            let id = match path.file_stem().and_then(|s| s.to_str()).and_then(CellId::from_string) {
                Some(id) => id,
                None => {
                    tracing::warn!(path = %path.display(), "skipping cell record with unparseable file name");
                    continue;
                }
            };
            match fs::read(&path).map_err(Error::from).and_then(|bytes| {
                bincode::deserialize::<CellRecord>(&bytes)
                    .map_err(|e| Error::PersistenceError(e.to_string()))
            }) {
                Ok(record) => system.rehydrate_bytes_cell(id, record),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable cell record");
                }
            }
        }

        Ok(system)
    }

    /// Rehydrates a cell whose `T` is opaque to the System: the on-disk
    /// `value`/`initial_value` bytes are kept as-is and only re-decoded by
    /// a typed caller via `open_cell`. The tag index is rebuilt for this
    /// cell immediately after it loads, before the next file is considered.
    fn rehydrate_bytes_cell(self: &Arc<Self>, id: CellId, record: CellRecord) {
        let cell = Arc::new(RawBytesCell::from_record(id, record));
        self.raw_records.insert(id, Arc::clone(&cell));
        self.cells.insert(id, cell as Arc<dyn AnyCell>);
        self.resync_tag_index(id);
    }

    fn hook(self: &Arc<Self>) -> AfterMutation {
        let weak: Weak<PersistentSystem> = Arc::downgrade(self);
        Arc::new(move |id: CellId| {
            if let Some(system) = weak.upgrade() {
                system.resync_tag_index(id);
                if let Some(writer) = system.writers.get(&id) {
                    if let Err(e) = writer() {
                        tracing::warn!(cell_id = %id, error = %e, "failed to persist cell after mutation");
                    }
                }
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

    /// Create a new durable cell, writing its initial record immediately.
    pub fn create_cell<T>(self: &Arc<Self>, initial: T) -> Result<ManagedCell<T>>
    where
        T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
    {
        self.create_cell_full(initial, std::iter::empty(), None)
    }

    pub fn create_cell_with_tags<T>(
        self: &Arc<Self>,
        initial: T,
        tags: impl IntoIterator<Item = Tag>,
    ) -> Result<ManagedCell<T>>
    where
        T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
    {
        self.create_cell_full(initial, tags, None)
    }

    /// Like `create_cell`, but with an explicit size function so
    /// `metadata.size` reflects the written value rather than `0`.
    pub fn create_cell_with_size_hint<T>(
        self: &Arc<Self>,
        initial: T,
        size_hint: memcell_cell::SizeHint<T>,
    ) -> Result<ManagedCell<T>>
    where
        T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
    {
        self.create_cell_full(initial, std::iter::empty(), Some(size_hint))
    }

    fn create_cell_full<T>(
        self: &Arc<Self>,
        initial: T,
        tags: impl IntoIterator<Item = Tag>,
        size_hint: Option<memcell_cell::SizeHint<T>>,
    ) -> Result<ManagedCell<T>>
    where
        T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
    {
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
        self.install_typed_cell(Arc::clone(&cell))?;
        Ok(ManagedCell::new(cell, self.hook()))
    }

    /// Re-open a typed handle onto a cell this System already loaded from
    /// disk at `open()` time. Returns `None` if no such id is registered.
    pub fn open_cell<T>(self: &Arc<Self>, id: CellId) -> Result<Option<ManagedCell<T>>>
    where
        T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
    {
        let raw = match self.raw_records.get(&id).map(|e| Arc::clone(e.value())) {
            Some(raw) => raw,
            None => return Ok(None),
        };

        let initial: T = bincode::deserialize(&raw.initial_value())
            .map_err(|e| Error::ReadError(e.to_string()))?;
        let value: Option<T> = raw
            .value()
            .map(|bytes| bincode::deserialize(&bytes).map_err(|e| Error::ReadError(e.to_string())))
            .transpose()?;
        let cell = Cell::from_parts(id, initial, value, raw.metadata(), Arc::clone(&self.clock));
        let cell = Arc::new(cell);
        self.install_typed_cell(Arc::clone(&cell))?;
        self.raw_records.remove(&id);
        Ok(Some(ManagedCell::new(cell, self.hook())))
    }

    fn install_typed_cell<T>(self: &Arc<Self>, cell: Arc<Cell<T>>) -> Result<()>
    where
        T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
    {
        let id = cell.id();
        let path = record_path(&self.base_dir, id);
        let write_cell = Arc::clone(&cell);
        let writer: Writer = Arc::new(move || {
            let record = CellRecord {
                value: write_cell
                    .peek()
                    .map(|v| bincode::serialize(&v).map_err(|e| Error::WriteError(e.to_string())))
                    .transpose()?,
                initial_value: bincode::serialize(write_cell.initial_value())
                    .map_err(|e| Error::WriteError(e.to_string()))?,
                metadata: write_cell.metadata(),
            };
            write_record_atomic(&path, &record)
        });
        writer()?;
        self.writers.insert(id, writer);
        self.cells.insert(id, Arc::clone(&cell) as Arc<dyn AnyCell>);
        self.resync_tag_index(id);
        Ok(())
    }
}

impl MemorySystem for PersistentSystem {
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

    /// Empties every cell and deletes every record file under `base_dir`.
    fn clear_all(&self) {
        for entry in self.cells.iter() {
            let id = *entry.key();
            entry.value().empty();
            let path = record_path(&self.base_dir, id);
            if let Err(e) = fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(cell_id = %id, error = %e, "failed to delete cell record during clear_all");
                }
            }
        }
        self.writers.clear();
        self.raw_records.clear();
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
                let id = *entry.key();
                entry.value().empty();
                if let Some(writer) = self.writers.get(&id) {
                    if let Err(e) = writer() {
                        tracing::warn!(cell_id = %id, error = %e, "failed to persist cell after cleanup");
                    }
                }
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
                let id = *entry.key();
                entry.value().empty();
                if let Some(writer) = self.writers.get(&id) {
                    if let Err(e) = writer() {
                        tracing::warn!(cell_id = %id, error = %e, "failed to persist cell after cleanup");
                    }
                }
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

impl PersistentSystem {
    pub fn enable_scheduled_cleanup(self: &Arc<Self>, interval: Duration) {
        let mut cleanup = self.cleanup.lock();
        if let Some(worker) = cleanup.as_mut() {
            worker.shutdown();
        }
        let weak: Weak<dyn MemorySystem> = Arc::downgrade(self) as Weak<dyn MemorySystem>;
        *cleanup = Some(CleanupWorker::spawn(weak, interval));
    }

    /// All cell ids this System currently knows about, for callers that
    /// want to call `open_cell` on everything found at `open()` time.
    pub fn cell_ids(&self) -> Vec<CellId> {
        self.cells.iter().map(|e| *e.key()).collect()
    }
}

/// Placeholder `AnyCell` for a cell this System loaded from disk but no
/// typed caller has re-opened yet. Holds the raw record bytes untouched so
/// `open_cell::<T>` can decode them once `T` is known.
struct RawBytesCell {
    id: CellId,
    value: Mutex<Option<Vec<u8>>>,
    initial_value: Vec<u8>,
    metadata: Mutex<Metadata>,
}

impl RawBytesCell {
    fn from_record(id: CellId, record: CellRecord) -> Self {
        Self {
            id,
            value: Mutex::new(record.value),
            initial_value: record.initial_value,
            metadata: Mutex::new(record.metadata),
        }
    }

    fn value(&self) -> Option<Vec<u8>> {
        self.value.lock().clone()
    }

    fn initial_value(&self) -> Vec<u8> {
        self.initial_value.clone()
    }
}

impl AnyCell for RawBytesCell {
    fn id(&self) -> CellId {
        self.id
    }

    fn metadata(&self) -> Metadata {
        self.metadata.lock().clone()
    }

    fn get_tags(&self) -> HashSet<Tag> {
        self.metadata.lock().tags.clone()
    }

    fn empty(&self) {
        let mut value = self.value.lock();
        *value = None;
        self.metadata.lock().size = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn created_cell_survives_a_reopen() {
        let dir = tempdir().unwrap();
        let id;
        {
            let system = PersistentSystem::open(dir.path()).unwrap();
            let cell = system.create_cell("hello".to_string()).unwrap();
            id = cell.id();
            cell.write("world".to_string());
        }

        let system = PersistentSystem::open(dir.path()).unwrap();
        let reopened: ManagedCell<String> = system.open_cell(id).unwrap().unwrap();
        assert_eq!(reopened.read(), Some("world".to_string()));
    }

    #[test]
    fn reopen_preserves_original_created_at_timestamp() {
        let dir = tempdir().unwrap();
        let id;
        let created_at;
        {
            let system = PersistentSystem::open(dir.path()).unwrap();
            let cell = system.create_cell(1_i32).unwrap();
            id = cell.id();
            created_at = cell.metadata().created_at;
        }

        let system = PersistentSystem::open(dir.path()).unwrap();
        let reopened: ManagedCell<i32> = system.open_cell(id).unwrap().unwrap();
        assert_eq!(reopened.metadata().created_at, created_at);
    }

    #[test]
    fn clear_restores_initial_value_across_reopen() {
        let dir = tempdir().unwrap();
        let id;
        {
            let system = PersistentSystem::open(dir.path()).unwrap();
            let cell = system.create_cell("first".to_string()).unwrap();
            id = cell.id();
            cell.write("second".to_string());
        }

        let system = PersistentSystem::open(dir.path()).unwrap();
        let reopened: ManagedCell<String> = system.open_cell(id).unwrap().unwrap();
        reopened.clear();
        assert_eq!(reopened.read(), Some("first".to_string()));
    }

    #[test]
    fn corrupt_record_is_skipped_without_failing_open() {
        let dir = tempdir().unwrap();
        {
            let system = PersistentSystem::open(dir.path()).unwrap();
            system.create_cell(1_i32).unwrap();
        }
        fs::write(dir.path().join("not-a-uuid.cell"), b"garbage").unwrap();

        let system = PersistentSystem::open(dir.path()).unwrap();
        assert_eq!(system.cell_count(), 1);
    }

    #[test]
    fn unknown_id_returns_none_on_open_cell() {
        let dir = tempdir().unwrap();
        let system = PersistentSystem::open(dir.path()).unwrap();
        let result: Option<ManagedCell<i32>> = system.open_cell(CellId::new()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn clear_all_deletes_record_files_from_disk() {
        let dir = tempdir().unwrap();
        let system = PersistentSystem::open(dir.path()).unwrap();
        let cell = system.create_cell(1_i32).unwrap();
        let path = record_path(dir.path(), cell.id());
        assert!(path.exists());
        system.clear_all();
        assert!(!path.exists());
    }

    #[test]
    fn write_leaves_no_stray_tmp_file_behind() {
        let dir = tempdir().unwrap();
        let system = PersistentSystem::open(dir.path()).unwrap();
        let cell = system.create_cell(1_i32).unwrap();
        cell.write(2);
        let tmp_files: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("tmp"))
            .collect();
        assert!(tmp_files.is_empty());
    }

    #[test]
    fn run_cleanup_persists_the_emptied_cell_to_disk() {
        use memcell_core::FakeClock;

        let dir = tempdir().unwrap();
        let clock = Arc::new(FakeClock::new());
        let id;
        {
            let system = PersistentSystem::open_with_clock(dir.path(), clock.clone()).unwrap();
            let cell = system.create_cell("hello".to_string()).unwrap();
            id = cell.id();
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
        }

        let reopened = PersistentSystem::open(dir.path()).unwrap();
        let cell: ManagedCell<String> = reopened.open_cell(id).unwrap().unwrap();
        assert_eq!(cell.read(), None);
    }
}
