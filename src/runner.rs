//! Service runner threads.
//!
//! One dedicated OS thread per service: apply the requested scheduling
//! policy and affinity (best-effort), then block on the release slot,
//! invoke the callback once per coalesced release, and record timing.
//! Invocations of one service are strictly serialized by construction.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::release::{ReleaseSlot, Wake};
use crate::rt;
use crate::service::ServiceCallback;
use crate::stats::ServiceStats;

pub(crate) struct Runner {
    pub name: String,
    pub callback: ServiceCallback,
    pub priority: i32,
    pub affinity: usize,
    pub slot: Arc<ReleaseSlot>,
    pub stats: Arc<Mutex<ServiceStats>>,
}

impl Runner {
    /// Thread body. Returns when the slot signals termination.
    pub fn run(mut self) {
        let fifo_applied = match rt::set_fifo_priority(self.priority) {
            Ok(()) => {
                log::info!("runner '{}': SCHED_FIFO priority {}", self.name, self.priority);
                true
            }
            Err(e) => {
                // Denied privileges degrade to the default policy
                log::warn!("runner '{}': {}; continuing unprivileged", self.name, e);
                false
            }
        };
        let affinity_applied = match rt::pin_to_cpu(self.affinity) {
            Ok(()) => {
                log::info!("runner '{}': pinned to CPU {}", self.name, self.affinity);
                true
            }
            Err(e) => {
                log::warn!("runner '{}': {}; affinity not applied", self.name, e);
                false
            }
        };
        {
            let mut stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
            stats.fifo_applied = fifo_applied;
            stats.affinity_applied = affinity_applied;
        }

        loop {
            match self.slot.wait() {
                Wake::Terminate => break,
                Wake::Release => {
                    let started = Instant::now();
                    (self.callback)();
                    let elapsed = started.elapsed();
                    self.slot.complete();

                    let mut stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
                    stats.record(elapsed);
                }
            }
        }

        log::debug!("runner '{}' terminated", self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    fn spawn_runner(
        slot: Arc<ReleaseSlot>,
        stats: Arc<Mutex<ServiceStats>>,
        callback: impl FnMut() + Send + 'static,
    ) -> std::thread::JoinHandle<()> {
        let runner = Runner {
            name: "test".to_string(),
            callback: Box::new(callback),
            priority: 10,
            affinity: 0,
            slot,
            stats,
        };
        std::thread::spawn(move || runner.run())
    }

    #[test]
    fn test_runs_once_per_release() {
        let slot = Arc::new(ReleaseSlot::new());
        let stats = Arc::new(Mutex::new(ServiceStats::new()));
        let count = Arc::new(AtomicU64::new(0));

        let handle = {
            let count = count.clone();
            spawn_runner(slot.clone(), stats.clone(), move || {
                count.fetch_add(1, Ordering::SeqCst);
            })
        };

        for _ in 0..3 {
            slot.release();
            std::thread::sleep(Duration::from_millis(20));
        }
        slot.terminate();
        handle.join().unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 3);
        let stats = stats.lock().unwrap();
        assert_eq!(stats.invocations, 3);
        assert_eq!(slot.overruns(), 0);
    }

    #[test]
    fn test_coalesced_release_runs_after_in_flight() {
        let slot = Arc::new(ReleaseSlot::new());
        let stats = Arc::new(Mutex::new(ServiceStats::new()));
        let count = Arc::new(AtomicU64::new(0));

        let handle = {
            let count = count.clone();
            spawn_runner(slot.clone(), stats.clone(), move || {
                count.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(80));
            })
        };

        slot.release();
        std::thread::sleep(Duration::from_millis(20));
        // Three more releases while the first invocation is still running:
        // they coalesce into one pending release and three overruns
        slot.release();
        slot.release();
        slot.release();

        std::thread::sleep(Duration::from_millis(250));
        slot.terminate();
        handle.join().unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(slot.overruns(), 3);
    }

    #[test]
    fn test_terminate_without_release_invokes_nothing() {
        let slot = Arc::new(ReleaseSlot::new());
        let stats = Arc::new(Mutex::new(ServiceStats::new()));
        let count = Arc::new(AtomicU64::new(0));

        let handle = {
            let count = count.clone();
            spawn_runner(slot.clone(), stats.clone(), move || {
                count.fetch_add(1, Ordering::SeqCst);
            })
        };

        std::thread::sleep(Duration::from_millis(20));
        slot.terminate();
        handle.join().unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
