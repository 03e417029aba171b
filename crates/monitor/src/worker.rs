//! Periodic metrics collection background task
//!
//! Same cancellation-token-plus-thread shape as the System's scheduled
//! cleanup worker: sleep in small increments, check a shared shutdown flag
//! between them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::Monitor;

const POLL_GRANULARITY: Duration = Duration::from_millis(100);

pub(crate) struct CollectionWorker {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CollectionWorker {
    pub(crate) fn spawn(monitor: Weak<Monitor>, interval: Duration) -> Self {
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
            match monitor.upgrade() {
                Some(monitor) => {
                    monitor.get_metrics();
                }
                None => return,
            }
        });

        Self {
            shutdown,
            handle: Some(handle),
        }
    }

    pub(crate) fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CollectionWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
