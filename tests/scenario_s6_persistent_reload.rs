use memcell::PersistentSystem;

#[test]
fn two_cells_survive_a_reload_of_the_same_directory() {
    let dir = tempfile::tempdir().unwrap();
    let (id1, id2);
    {
        let system = PersistentSystem::open(dir.path()).unwrap();
        let cell1 = system.create_cell("initial1".to_string()).unwrap();
        let cell2 = system.create_cell("initial2".to_string()).unwrap();
        id1 = cell1.id();
        id2 = cell2.id();
        cell1.write("updated1".to_string());
        cell2.write("updated2".to_string());
    }

    let reopened = PersistentSystem::open(dir.path()).unwrap();
    assert_eq!(reopened.get_all_cells().len(), 2);

    let cell1: memcell::ManagedCell<String> = reopened.open_cell(id1).unwrap().unwrap();
    let cell2: memcell::ManagedCell<String> = reopened.open_cell(id2).unwrap().unwrap();
    assert_eq!(cell1.read(), Some("updated1".to_string()));
    assert_eq!(cell2.read(), Some("updated2".to_string()));
}
