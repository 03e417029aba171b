//! Core types shared across the memory subsystem
//!
//! This crate defines the foundational, behavior-free types used by
//! `memcell-cell`, `memcell-system` and `memcell-monitor`:
//! - `CellId` / `Tag`: identity types.
//! - `Timestamp` / `Clock`: a serializable instant and its abstraction.
//! - `Metadata`: the per-cell bookkeeping snapshot.
//! - `Error` / `Result`: the shared error taxonomy.

#![warn(clippy::all)]

pub mod clock;
pub mod error;
pub mod ids;
pub mod metadata;
pub mod timestamp;

pub use clock::{Clock, FakeClock, SystemClock};
pub use error::{Error, Result};
pub use ids::{CellId, Tag};
pub use metadata::Metadata;
pub use timestamp::Timestamp;
