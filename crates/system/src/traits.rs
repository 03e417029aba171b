//! The dyn-compatible System surface a Monitor can hold weak references to

use crate::any_cell::AnyCell;
use memcell_cell::CleanupStrategy;
use memcell_core::Tag;
use std::sync::Arc;

/// Operations common to `InMemorySystem` and `PersistentSystem` that don't
/// depend on any particular cell's `T`. A `Monitor` holds
/// `Vec<Weak<dyn MemorySystem>>` so it can poll metrics without owning, or
/// being owned by, the System it watches.
pub trait MemorySystem: Send + Sync {
    fn get_cells_by_tag(&self, tag: &Tag) -> Vec<Arc<dyn AnyCell>>;
    fn get_all_cells(&self) -> Vec<Arc<dyn AnyCell>>;
    fn clear_all(&self);

    fn register_cleanup_strategy(&self, name: String, strategy: CleanupStrategy);
    fn unregister_cleanup_strategy(&self, name: &str);
    fn get_cleanup_strategies(&self) -> Vec<(String, CleanupStrategy)>;

    /// Run every registered strategy once; returns the number of cells emptied.
    fn run_cleanup(&self) -> usize;
    /// Run a single named strategy once; returns the number of cells emptied.
    /// A name with no registered strategy empties nothing.
    fn run_cleanup_named(&self, name: &str) -> usize;

    /// Stop the scheduled cleanup thread, if one is running. Starting one
    /// lives on the concrete System type (`enable_scheduled_cleanup`),
    /// since it needs an `Arc<Self>` to hand the worker a `Weak` back-ref.
    fn disable_automatic_cleanup(&self);

    fn total_size(&self) -> usize;
    fn cell_count(&self) -> usize;
}
