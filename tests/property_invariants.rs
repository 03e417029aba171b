//! Property-based tests for the cell/system invariants.

use memcell::{Cell, CellId, FakeClock, InMemorySystem, Tag};
use proptest::prelude::*;
use std::sync::Arc;

fn cell_with(initial: String) -> Cell<String> {
    Cell::new(CellId::new(), initial, Arc::new(FakeClock::new()))
}

proptest! {
    /// Invariant 1: for any `v`, `write(v)` followed by `read()` returns `Some(v)`.
    #[test]
    fn write_then_read_returns_what_was_written(initial in ".*", v in ".*") {
        let cell = cell_with(initial);
        cell.write(v.clone());
        prop_assert_eq!(cell.read(), Some(v));
    }

    /// Invariant 2: `update(f)` on a cell holding `v` is observationally
    /// equivalent to `write(f(Some(v)))`.
    #[test]
    fn update_matches_write_of_f_applied_to_current(initial in ".*", suffix in ".*") {
        let f = |v: Option<String>| format!("{}{}", v.unwrap_or_default(), suffix);

        let a = cell_with(initial.clone());
        a.update(f);

        let b = cell_with(initial.clone());
        b.write(f(Some(initial)));

        prop_assert_eq!(a.read(), b.read());
    }

    /// Invariant 3: `clear()` always restores the constructor's initial value,
    /// no matter how many writes happened in between.
    #[test]
    fn clear_restores_initial_value_after_any_sequence_of_writes(
        initial in ".*",
        writes in prop::collection::vec(".*", 0..10),
    ) {
        let cell = cell_with(initial.clone());
        for w in writes {
            cell.write(w);
        }
        cell.clear();
        prop_assert_eq!(cell.read(), Some(initial));
    }

    /// Invariant 4: tag-index membership mirrors each cell's tag set — no
    /// dangling entries survive a `remove_tag`, for any subset of tags added
    /// and then removed.
    #[test]
    fn tag_index_never_dangles_after_removal(
        added in prop::collection::hash_set("[a-z]{1,4}", 1..5),
        removed in prop::collection::hash_set("[a-z]{1,4}", 0..5),
    ) {
        let system = InMemorySystem::new();
        let tags: Vec<Tag> = added.iter().map(|s| Tag::new(s.clone())).collect();
        let cell = system.create_cell_with_tags(0_i32, tags);

        for tag in &removed {
            cell.remove_tag(&Tag::new(tag.clone()));
        }

        let still_tagged = cell.get_tags();
        for tag_str in &added {
            let tag = Tag::new(tag_str.clone());
            let in_index = system.get_cells_by_tag(&tag).iter().any(|c| c.id() == cell.id());
            prop_assert_eq!(still_tagged.contains(&tag), in_index);
        }
    }
}
