//! Point-in-time aggregate metrics and the bounded history that holds them

use memcell_core::{Tag, Timestamp};
use std::collections::{HashMap, VecDeque};

/// Default number of snapshots a Monitor retains before evicting the oldest.
pub const DEFAULT_HISTORY_CAPACITY: usize = 256;

/// Aggregate metrics across every System a Monitor is watching, at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub timestamp: Timestamp,
    pub total_cells: usize,
    pub total_size: usize,
    /// `0` when `total_cells == 0`.
    pub average_size: f64,
    /// `0` when `total_cells == 0`.
    pub largest_cell: usize,
    /// `0` when `total_cells == 0`.
    pub smallest_cell: usize,
    pub cells_by_tag: HashMap<Tag, usize>,
}

impl MetricsSnapshot {
    /// Aggregate `sizes`/`tags_per_cell` into a snapshot at `timestamp`.
    /// `sizes` and `tags_per_cell` must be index-aligned (one entry per cell).
    pub(crate) fn from_sizes_and_tags(
        timestamp: Timestamp,
        sizes: &[usize],
        tags_per_cell: &[std::collections::HashSet<Tag>],
    ) -> Self {
        let total_cells = sizes.len();
        let total_size: usize = sizes.iter().sum();
        let average_size = if total_cells == 0 {
            0.0
        } else {
            total_size as f64 / total_cells as f64
        };
        let largest_cell = sizes.iter().copied().max().unwrap_or(0);
        let smallest_cell = if total_cells == 0 {
            0
        } else {
            sizes.iter().copied().min().unwrap_or(0)
        };
        let mut cells_by_tag: HashMap<Tag, usize> = HashMap::new();
        for tags in tags_per_cell {
            for tag in tags {
                *cells_by_tag.entry(tag.clone()).or_insert(0) += 1;
            }
        }
        Self {
            timestamp,
            total_cells,
            total_size,
            average_size,
            largest_cell,
            smallest_cell,
            cells_by_tag,
        }
    }
}

/// A bounded, oldest-evicted-first sequence of snapshots.
pub(crate) struct History {
    capacity: usize,
    snapshots: VecDeque<MetricsSnapshot>,
}

impl History {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            snapshots: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    pub(crate) fn push(&mut self, snapshot: MetricsSnapshot) {
        if self.snapshots.len() >= self.capacity {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(snapshot);
    }

    pub(crate) fn range(&self, from: Timestamp, to: Timestamp) -> Vec<MetricsSnapshot> {
        self.snapshots
            .iter()
            .filter(|s| s.timestamp >= from && s.timestamp <= to)
            .cloned()
            .collect()
    }
}
