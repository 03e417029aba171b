//! Typed storage cells, compression, and cleanup-eligibility rules
//!
//! `Cell<T>` is the base storage primitive; `CompressedCell<T>` wraps it
//! with transparent serialize/compress-on-write; `CleanupStrategy` is the
//! closed rule algebra that `memcell-system` evaluates against a cell's
//! `Metadata` to decide what to reclaim.

pub mod cell;
pub mod compression;
pub mod strategy;

pub use cell::{Cell, SizeHint};
pub use compression::{CompressedCell, CompressionAlgorithm, CompressionStats, DEFAULT_THRESHOLD};
pub use strategy::CleanupStrategy;
