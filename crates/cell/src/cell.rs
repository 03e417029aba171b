//! The Cell: a single typed storage slot with metadata
//!
//! Every mutating operation (`write`, `update`, `clear`, `empty`,
//! `add_tag`, `remove_tag`) is serialized through one `parking_lot::Mutex`
//! per cell, so operations on the same cell are linearizable. Reads take
//! the same lock briefly to update `last_accessed` and clone the value out.

use memcell_core::{CellId, Clock, Metadata, Tag, Timestamp};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

struct CellState<T> {
    value: Option<T>,
    metadata: Metadata,
}

/// A sizing function supplied by the caller. Cells with no hint report a
/// best-effort size of `0` for non-empty values, per the "best-effort"
/// wording of the size invariant.
pub type SizeHint<T> = Arc<dyn Fn(&T) -> usize + Send + Sync>;

/// A single typed storage slot plus metadata.
///
/// `T` is fixed for the lifetime of the cell. The initial value is
/// retained so that `clear()` is well-defined without external input.
pub struct Cell<T: Clone + Send + Sync + 'static> {
    id: CellId,
    initial: T,
    state: Mutex<CellState<T>>,
    clock: Arc<dyn Clock>,
    size_hint: Option<SizeHint<T>>,
}

impl<T: Clone + Send + Sync + 'static> Cell<T> {
    /// Create a cell holding `initial` as both its current and restore value.
    pub fn new(id: CellId, initial: T, clock: Arc<dyn Clock>) -> Self {
        Self::with_size_hint(id, initial, clock, None)
    }

    /// Like `new`, but with an explicit size function for `metadata.size`.
    pub fn with_size_hint(
        id: CellId,
        initial: T,
        clock: Arc<dyn Clock>,
        size_hint: Option<SizeHint<T>>,
    ) -> Self {
        let now = clock.now();
        let size = size_hint.as_ref().map(|f| f(&initial)).unwrap_or(0);
        let mut metadata = Metadata::new(now);
        metadata.size = size;
        let value = initial.clone();
        Self {
            id,
            initial,
            state: Mutex::new(CellState { value: Some(value), metadata }),
            clock,
            size_hint,
        }
    }

    /// Reconstruct a cell from previously-recorded state — used by the
    /// persistence layer on reload, where `metadata`'s timestamps must
    /// survive the restart rather than being reset to "now".
    pub fn from_parts(
        id: CellId,
        initial: T,
        value: Option<T>,
        metadata: Metadata,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            id,
            initial,
            state: Mutex::new(CellState { value, metadata }),
            clock,
            size_hint: None,
        }
    }

    pub fn id(&self) -> CellId {
        self.id
    }

    fn size_of(&self, v: &T) -> usize {
        self.size_hint.as_ref().map(|f| f(v)).unwrap_or(0)
    }

    /// Current value. Advances `last_accessed`.
    pub fn read(&self) -> Option<T> {
        let mut state = self.state.lock();
        state.metadata.mark_accessed(self.clock.now());
        state.value.clone()
    }

    /// Store `v`. Advances both `last_modified` and `last_accessed`.
    pub fn write(&self, v: T) {
        let size = self.size_of(&v);
        let mut state = self.state.lock();
        state.value = Some(v);
        state.metadata.mark_modified(self.clock.now(), size);
    }

    /// Apply `f` to the current value (whatever it is, including `None`)
    /// and store the result. Runs under the cell's exclusive lock, so `f`
    /// observes the value that will be written back.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(Option<T>) -> T,
    {
        let mut state = self.state.lock();
        let new_value = f(state.value.clone());
        let size = self.size_of(&new_value);
        state.value = Some(new_value);
        state.metadata.mark_modified(self.clock.now(), size);
    }

    /// Restore the constructor's initial value.
    pub fn clear(&self) {
        let size = self.size_of(&self.initial);
        let mut state = self.state.lock();
        state.value = Some(self.initial.clone());
        state.metadata.mark_modified(self.clock.now(), size);
    }

    /// Set the value to `None` and size to `0`.
    pub fn empty(&self) {
        let mut state = self.state.lock();
        state.value = None;
        state.metadata.mark_modified(self.clock.now(), 0);
    }

    /// Snapshot of the cell's bookkeeping state. Never mutates access time.
    pub fn metadata(&self) -> Metadata {
        self.state.lock().metadata.clone()
    }

    pub fn add_tag(&self, tag: Tag) {
        let mut state = self.state.lock();
        state.metadata.tags.insert(tag);
        state.metadata.mark_tags_modified(self.clock.now());
    }

    pub fn remove_tag(&self, tag: &Tag) {
        let mut state = self.state.lock();
        state.metadata.tags.remove(tag);
        state.metadata.mark_tags_modified(self.clock.now());
    }

    pub fn get_tags(&self) -> HashSet<Tag> {
        self.state.lock().metadata.tags.clone()
    }

    /// The value this cell was constructed with; used by callers that need
    /// to persist or re-derive the restore value without calling `clear()`.
    pub fn initial_value(&self) -> &T {
        &self.initial
    }

    /// Current value without bumping `last_accessed`. Meant for bookkeeping
    /// callers (persistence, metrics) that need a value snapshot on behalf
    /// of the System rather than on behalf of a caller's `read()`.
    pub fn peek(&self) -> Option<T> {
        self.state.lock().value.clone()
    }

    pub fn last_modified(&self) -> Timestamp {
        self.state.lock().metadata.last_modified
    }
}
