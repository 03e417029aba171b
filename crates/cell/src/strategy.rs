//! Cleanup strategy algebra
//!
//! `CleanupStrategy` is a closed enum rather than a trait object: the set of
//! ways a cell can become eligible for cleanup is fixed, and the `Any`/`All`
//! combinators give callers composition without needing dynamic dispatch
//! or a plugin registry.

use memcell_core::{Metadata, Tag, Timestamp};
use std::time::Duration;

/// A rule that decides whether a cell's metadata makes it eligible for
/// cleanup "now".
#[derive(Debug, Clone)]
pub enum CleanupStrategy {
    /// Eligible once `now - last_accessed > max_idle`.
    TimeBasedAccess { max_idle: Duration },
    /// Eligible once `now - last_modified > max_age`.
    TimeBasedModification { max_age: Duration },
    /// Eligible once `metadata.size > max_size`.
    SizeBasedCleanup { max_size: usize },
    /// Eligible when the cell's tags and `tags` intersect (share at least
    /// one tag) — not when every named tag is present.
    TagBasedCleanup { tags: Vec<Tag> },
    /// Eligible when at least one inner strategy matches.
    Any(Vec<CleanupStrategy>),
    /// Eligible when every inner strategy matches. An empty list matches
    /// nothing, the same as `Any` with an empty list.
    All(Vec<CleanupStrategy>),
}

impl CleanupStrategy {
    /// A stable, human-readable name, used for registry keys and logging.
    ///
    /// `TimeBasedAccess`/`TimeBasedModification`/`SizeBasedCleanup` are the
    /// leaf names a caller matches on.
    pub fn name(&self) -> String {
        match self {
            CleanupStrategy::TimeBasedAccess { .. } => "TimeBasedAccess".to_string(),
            CleanupStrategy::TimeBasedModification { .. } => {
                "TimeBasedModification".to_string()
            }
            CleanupStrategy::SizeBasedCleanup { .. } => "SizeBasedCleanup".to_string(),
            CleanupStrategy::TagBasedCleanup { .. } => "TagBasedCleanup".to_string(),
            CleanupStrategy::Any(inner) => format!(
                "any({})",
                inner.iter().map(CleanupStrategy::name).collect::<Vec<_>>().join(",")
            ),
            CleanupStrategy::All(inner) => format!(
                "all({})",
                inner.iter().map(CleanupStrategy::name).collect::<Vec<_>>().join(",")
            ),
        }
    }

    /// Whether `metadata` is eligible for cleanup as of `now`.
    pub fn matches(&self, metadata: &Metadata, now: Timestamp) -> bool {
        match self {
            CleanupStrategy::TimeBasedAccess { max_idle } => now
                .duration_since(metadata.last_accessed)
                .map(|idle| idle > *max_idle)
                .unwrap_or(false),
            CleanupStrategy::TimeBasedModification { max_age } => now
                .duration_since(metadata.last_modified)
                .map(|age| age > *max_age)
                .unwrap_or(false),
            CleanupStrategy::SizeBasedCleanup { max_size } => metadata.size > *max_size,
            CleanupStrategy::TagBasedCleanup { tags } => {
                tags.iter().any(|t| metadata.tags.contains(t))
            }
            // Short-circuits: the first matching/non-matching inner strategy
            // decides the result without evaluating the rest.
            CleanupStrategy::Any(inner) => inner.iter().any(|s| s.matches(metadata, now)),
            CleanupStrategy::All(inner) => {
                !inner.is_empty() && inner.iter().all(|s| s.matches(metadata, now))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn metadata_at(last_accessed: u64, last_modified: u64, size: usize) -> Metadata {
        Metadata {
            created_at: Timestamp::from_micros(0),
            last_accessed: Timestamp::from_micros(last_accessed),
            last_modified: Timestamp::from_micros(last_modified),
            size,
            tags: HashSet::new(),
        }
    }

    #[test]
    fn time_based_access_matches_once_idle_exceeds_threshold() {
        let strategy = CleanupStrategy::TimeBasedAccess {
            max_idle: Duration::from_secs(10),
        };
        let meta = metadata_at(0, 0, 0);
        assert!(!strategy.matches(&meta, Timestamp::from_micros(5_000_000)));
        assert!(!strategy.matches(&meta, Timestamp::from_micros(10_000_000)));
        assert!(strategy.matches(&meta, Timestamp::from_micros(10_000_001)));
    }

    #[test]
    fn time_based_modification_ignores_access_time() {
        let strategy = CleanupStrategy::TimeBasedModification {
            max_age: Duration::from_secs(1),
        };
        let meta = metadata_at(10_000_000, 0, 0);
        assert!(!strategy.matches(&meta, Timestamp::from_micros(1_000_000)));
        assert!(strategy.matches(&meta, Timestamp::from_micros(1_000_001)));
    }

    #[test]
    fn size_based_cleanup_matches_strictly_above_threshold() {
        let strategy = CleanupStrategy::SizeBasedCleanup { max_size: 100 };
        assert!(strategy.matches(&metadata_at(0, 0, 101), Timestamp::from_micros(0)));
        assert!(!strategy.matches(&metadata_at(0, 0, 100), Timestamp::from_micros(0)));
    }

    #[test]
    fn tag_based_cleanup_matches_on_any_shared_tag() {
        let mut meta = metadata_at(0, 0, 0);
        meta.tags.insert(Tag::new("a"));
        let strategy = CleanupStrategy::TagBasedCleanup {
            tags: vec![Tag::new("b"), Tag::new("c")],
        };
        assert!(!strategy.matches(&meta, Timestamp::from_micros(0)));
        meta.tags.insert(Tag::new("b"));
        assert!(strategy.matches(&meta, Timestamp::from_micros(0)));
    }

    #[test]
    fn any_matches_when_a_single_inner_strategy_matches() {
        let strategy = CleanupStrategy::Any(vec![
            CleanupStrategy::SizeBasedCleanup { max_size: 1_000_000 },
            CleanupStrategy::TimeBasedAccess {
                max_idle: Duration::from_secs(1),
            },
        ]);
        let meta = metadata_at(0, 0, 10);
        assert!(strategy.matches(&meta, Timestamp::from_micros(2_000_000)));
    }

    #[test]
    fn all_requires_every_inner_strategy_and_rejects_empty() {
        let meta = metadata_at(0, 0, 500);
        let strategy = CleanupStrategy::All(vec![
            CleanupStrategy::SizeBasedCleanup { max_size: 100 },
            CleanupStrategy::TimeBasedAccess {
                max_idle: Duration::from_secs(10),
            },
        ]);
        assert!(!strategy.matches(&meta, Timestamp::from_micros(5_000_000)));
        assert!(strategy.matches(&meta, Timestamp::from_micros(10_000_001)));

        let empty = CleanupStrategy::All(vec![]);
        assert!(!empty.matches(&meta, Timestamp::from_micros(10_000_001)));
    }

    #[test]
    fn name_reflects_combinator_nesting() {
        let strategy = CleanupStrategy::Any(vec![
            CleanupStrategy::SizeBasedCleanup { max_size: 1 },
            CleanupStrategy::TimeBasedAccess {
                max_idle: Duration::from_secs(1),
            },
        ]);
        assert_eq!(strategy.name(), "any(SizeBasedCleanup,TimeBasedAccess)");
    }
}
