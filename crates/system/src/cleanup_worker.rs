//! Scheduled cleanup background task
//!
//! A thread that sleeps in small increments so a cancellation request is
//! picked up promptly, rather than blocking on the full interval or a
//! condvar.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::traits::MemorySystem;

const POLL_GRANULARITY: Duration = Duration::from_millis(100);

pub struct CleanupWorker {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CleanupWorker {
    /// Spawn a thread that calls `system.run_cleanup()` every `interval`
    /// until shut down or the System is dropped (weak reference fails to
    /// upgrade, at which point the thread exits on its own).
    pub fn spawn(system: Weak<dyn MemorySystem>, interval: Duration) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let worker_shutdown = Arc::clone(&shutdown);

        let handle = thread::spawn(move || loop {
            let sleep_step = POLL_GRANULARITY.min(interval);
            let mut elapsed = Duration::ZERO;
            while elapsed < interval {
                if worker_shutdown.load(Ordering::Relaxed) {
                    return;
                }
                thread::sleep(sleep_step);
                elapsed += sleep_step;
            }
            if worker_shutdown.load(Ordering::Relaxed) {
                return;
            }
            match system.upgrade() {
                Some(system) => {
                    let emptied = system.run_cleanup();
                    tracing::info!(emptied, "scheduled cleanup pass complete");
                }
                None => return,
            }
        });

        Self {
            shutdown,
            handle: Some(handle),
        }
    }

    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CleanupWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
