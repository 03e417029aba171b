//! Systems: cell registries with tag indexing, cleanup, and persistence
//!
//! `InMemorySystem` and `PersistentSystem` both implement `MemorySystem`,
//! the dyn-compatible surface a `Monitor` polls via weak references.

pub mod any_cell;
pub mod cleanup_worker;
pub mod in_memory;
pub mod managed;
pub mod persistent;
pub mod traits;

pub use any_cell::AnyCell;
pub use in_memory::InMemorySystem;
pub use managed::{ManagedCell, ManagedCompressedCell};
pub use persistent::PersistentSystem;
pub use traits::MemorySystem;
