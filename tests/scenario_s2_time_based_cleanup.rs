use memcell::{CleanupStrategy, FakeClock, InMemorySystem};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn idle_cell_is_emptied_once_it_exceeds_max_idle() {
    let clock = Arc::new(FakeClock::new());
    let system = InMemorySystem::with_clock(clock.clone());
    let cell = system.create_cell("test".to_string());

    system.register_cleanup_strategy(
        "idle".to_string(),
        CleanupStrategy::TimeBasedAccess {
            max_idle: Duration::from_secs(1),
        },
    );

    clock.advance(Duration::from_secs(2));
    let emptied = system.run_cleanup_named("idle");

    assert_eq!(emptied, 1);
    assert_eq!(cell.read(), None);
}
