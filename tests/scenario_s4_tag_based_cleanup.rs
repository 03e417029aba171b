use memcell::{CleanupStrategy, InMemorySystem, Tag};

#[test]
fn tag_based_cleanup_only_empties_cells_carrying_the_named_tag() {
    let system = InMemorySystem::new();
    let temp_cell = system.create_cell_with_tags("test1".to_string(), vec![Tag::new("temp")]);
    let permanent_cell =
        system.create_cell_with_tags("test2".to_string(), vec![Tag::new("permanent")]);

    system.register_cleanup_strategy(
        "temp".to_string(),
        CleanupStrategy::TagBasedCleanup {
            tags: vec![Tag::new("temp")],
        },
    );

    let emptied = system.run_cleanup_named("temp");

    assert_eq!(emptied, 1);
    assert_eq!(temp_cell.read(), None);
    assert_eq!(permanent_cell.read(), Some("test2".to_string()));
}
