//! # memcell
//!
//! A typed, concurrent cell store for agent memory: indexed lookup by tag,
//! transparent compression, pluggable cleanup, and optional durable
//! persistence.
//!
//! # Quick Start
//!
//! ```no_run
//! use memcell::{InMemorySystem, Tag};
//!
//! fn main() {
//!     let system = InMemorySystem::new();
//!
//!     // A typed cell, tagged for later lookup.
//!     let cell = system.create_cell_with_tags(
//!         "conversation-summary".to_string(),
//!         vec![Tag::new("session:42")],
//!     );
//!     cell.write("the user asked about pricing".to_string());
//!
//!     // Find it again by tag, without knowing its id.
//!     let found = system.get_cells_by_tag(&Tag::new("session:42"));
//!     assert_eq!(found.len(), 1);
//! }
//! ```
//!
//! # Components
//!
//! | Component | Purpose | Key types |
//! |-----------|---------|-----------|
//! | **Cell** | One typed, tagged storage slot | `Cell`, `CompressedCell` |
//! | **Strategy** | Cleanup-eligibility rules | `CleanupStrategy` |
//! | **System** | Registry, tag index, scheduled cleanup, persistence | `InMemorySystem`, `PersistentSystem` |
//! | **Monitor** | Aggregate size/count metrics across Systems | `Monitor`, `MetricsSnapshot` |
//!
//! # Architecture
//!
//! `InMemorySystem` and `PersistentSystem` both implement `MemorySystem`,
//! the surface a `Monitor` polls through weak references — a Monitor never
//! keeps a System alive, and a dropped System is simply skipped on the next
//! poll. Cells never hold a strong reference back to their owning System;
//! mutation notifications flow through a hook installed at creation time.

pub use memcell_cell::{
    Cell, CleanupStrategy, CompressedCell, CompressionAlgorithm, CompressionStats, SizeHint,
    DEFAULT_THRESHOLD,
};
pub use memcell_core::{CellId, Clock, Error, FakeClock, Metadata, Result, SystemClock, Tag, Timestamp};
pub use memcell_monitor::{Monitor, MetricsSnapshot, DEFAULT_HISTORY_CAPACITY};
pub use memcell_system::{AnyCell, InMemorySystem, ManagedCell, ManagedCompressedCell, MemorySystem, PersistentSystem};
