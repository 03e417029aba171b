//! Cell metadata
//!
//! Metadata is a plain, serializable snapshot: timestamps, best-effort
//! size, and the tag set. It carries no behavior of its own — cleanup
//! strategies (in `memcell-cell`) are pure functions of `&Metadata` plus
//! "now", which is what keeps them from accidentally behaving like a read.

use crate::ids::Tag;
use crate::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A point-in-time snapshot of a Cell's bookkeeping state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub created_at: Timestamp,
    pub last_accessed: Timestamp,
    pub last_modified: Timestamp,
    /// Best-effort size in bytes: serialized length where a codec is
    /// available, `0` when the cell is empty or no codec applies.
    pub size: usize,
    pub tags: HashSet<Tag>,
}

impl Metadata {
    /// A freshly-created cell's metadata: all three timestamps equal, no tags.
    pub fn new(now: Timestamp) -> Self {
        Self {
            created_at: now,
            last_accessed: now,
            last_modified: now,
            size: 0,
            tags: HashSet::new(),
        }
    }

    /// Record a read: only `last_accessed` moves.
    pub fn mark_accessed(&mut self, now: Timestamp) {
        self.last_accessed = now;
    }

    /// Record a write/update/clear/empty: both access and modification move.
    pub fn mark_modified(&mut self, now: Timestamp, size: usize) {
        self.last_modified = now;
        self.last_accessed = now;
        self.size = size;
    }

    /// Record a tag mutation: only `last_modified` moves, not `last_accessed`.
    pub fn mark_tags_modified(&mut self, now: Timestamp) {
        self.last_modified = now;
    }
}
