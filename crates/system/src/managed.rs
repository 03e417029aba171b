//! Proxy handles returned by a System's `create_cell*` family
//!
//! `ManagedCell<T>` wraps an `Arc<Cell<T>>` and, after every mutating call,
//! invokes an `after_mutation` hook installed by the owning System. This is
//! the one mechanism that keeps a System's tag index (and, for a
//! `PersistentSystem`, its on-disk record) in sync without the cell holding
//! a strong reference back to its System.

use memcell_core::{CellId, Metadata, Result, Tag};
use memcell_cell::{Cell, CompressedCell, CompressionStats};
use std::sync::Arc;

pub(crate) type AfterMutation = Arc<dyn Fn(CellId) + Send + Sync>;

/// A typed handle to a plain cell managed by a System.
pub struct ManagedCell<T: Clone + Send + Sync + 'static> {
    pub(crate) cell: Arc<Cell<T>>,
    pub(crate) after_mutation: AfterMutation,
}

impl<T: Clone + Send + Sync + 'static> ManagedCell<T> {
    pub(crate) fn new(cell: Arc<Cell<T>>, after_mutation: AfterMutation) -> Self {
        Self { cell, after_mutation }
    }

    pub fn id(&self) -> CellId {
        self.cell.id()
    }

    pub fn read(&self) -> Option<T> {
        self.cell.read()
    }

    pub fn write(&self, v: T) {
        self.cell.write(v);
        (self.after_mutation)(self.cell.id());
    }

    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(Option<T>) -> T,
    {
        self.cell.update(f);
        (self.after_mutation)(self.cell.id());
    }

    pub fn clear(&self) {
        self.cell.clear();
        (self.after_mutation)(self.cell.id());
    }

    pub fn empty(&self) {
        self.cell.empty();
        (self.after_mutation)(self.cell.id());
    }

    pub fn metadata(&self) -> Metadata {
        self.cell.metadata()
    }

    pub fn add_tag(&self, tag: Tag) {
        self.cell.add_tag(tag);
        (self.after_mutation)(self.cell.id());
    }

    pub fn remove_tag(&self, tag: &Tag) {
        self.cell.remove_tag(tag);
        (self.after_mutation)(self.cell.id());
    }

    pub fn get_tags(&self) -> std::collections::HashSet<Tag> {
        self.cell.get_tags()
    }
}

/// A typed handle to a compressed cell managed by a System.
pub struct ManagedCompressedCell<T: Clone + Send + Sync + 'static> {
    pub(crate) cell: Arc<CompressedCell<T>>,
    pub(crate) after_mutation: AfterMutation,
}

impl<T: Clone + Send + Sync + 'static> ManagedCompressedCell<T> {
    pub(crate) fn new(cell: Arc<CompressedCell<T>>, after_mutation: AfterMutation) -> Self {
        Self { cell, after_mutation }
    }

    pub fn id(&self) -> CellId {
        self.cell.id()
    }

    pub fn read(&self) -> Result<Option<T>> {
        self.cell.read()
    }

    pub fn write(&self, v: T) -> Result<()> {
        self.cell.write(v)?;
        (self.after_mutation)(self.cell.id());
        Ok(())
    }

    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(Option<T>) -> T,
    {
        self.cell.update(f)?;
        (self.after_mutation)(self.cell.id());
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.cell.clear()?;
        (self.after_mutation)(self.cell.id());
        Ok(())
    }

    pub fn empty(&self) {
        self.cell.empty();
        (self.after_mutation)(self.cell.id());
    }

    pub fn force_compress(&self) -> Result<Option<CompressionStats>> {
        let stats = self.cell.force_compress()?;
        (self.after_mutation)(self.cell.id());
        Ok(stats)
    }

    pub fn get_compression_stats(&self) -> Option<CompressionStats> {
        self.cell.get_compression_stats()
    }

    pub fn metadata(&self) -> Metadata {
        self.cell.metadata()
    }

    pub fn add_tag(&self, tag: Tag) {
        self.cell.add_tag(tag);
        (self.after_mutation)(self.cell.id());
    }

    pub fn remove_tag(&self, tag: &Tag) {
        self.cell.remove_tag(tag);
        (self.after_mutation)(self.cell.id());
    }

    pub fn get_tags(&self) -> std::collections::HashSet<Tag> {
        self.cell.get_tags()
    }
}
