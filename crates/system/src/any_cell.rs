//! Type-erased cell access for the System's registry
//!
//! A System needs to hold cells of many different `T`s in one map and run
//! cleanup/metrics over all of them uniformly. `AnyCell` is the seam: it
//! exposes exactly the operations that never need to recover `T` (identity,
//! metadata, tags, and the cleanup action itself). Typed `read`/`write`
//! stay behind the `ManagedCell<T>` handle a caller gets back from
//! `create_cell`, so no `Any`-downcasting is ever needed.

use memcell_core::{CellId, Metadata, Tag};
use memcell_cell::{Cell, CompressedCell};
use std::collections::HashSet;

pub trait AnyCell: Send + Sync {
    fn id(&self) -> CellId;
    fn metadata(&self) -> Metadata;
    fn get_tags(&self) -> HashSet<Tag>;
    /// The cleanup action: empties the value, per the resolved cleanup
    /// action policy (cells are emptied in place, never removed from the
    /// registry, by this call alone).
    fn empty(&self);
}

impl<T: Clone + Send + Sync + 'static> AnyCell for Cell<T> {
    fn id(&self) -> CellId {
        Cell::id(self)
    }

    fn metadata(&self) -> Metadata {
        Cell::metadata(self)
    }

    fn get_tags(&self) -> HashSet<Tag> {
        Cell::get_tags(self)
    }

    fn empty(&self) {
        Cell::empty(self)
    }
}

impl<T: Clone + Send + Sync + 'static> AnyCell for CompressedCell<T> {
    fn id(&self) -> CellId {
        CompressedCell::id(self)
    }

    fn metadata(&self) -> Metadata {
        CompressedCell::metadata(self)
    }

    fn get_tags(&self) -> HashSet<Tag> {
        CompressedCell::get_tags(self)
    }

    fn empty(&self) {
        CompressedCell::empty(self)
    }
}
