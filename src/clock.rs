//! Master clock.
//!
//! A dedicated thread that ticks at the fixed master interval and releases
//! every service whose divider divides the current tick. Each wake targets
//! an absolute deadline `origin + n * interval` so wakeup latency never
//! accumulates into drift, which a relative sleep recomputed per iteration
//! would cause.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::release::ReleaseSlot;

/// Stop signal shared by the master thread and the lifecycle controller.
/// The condvar lets a stop request cut a tick sleep short instead of
/// waiting out the full interval.
#[derive(Debug, Default)]
pub(crate) struct Shutdown {
    flag: AtomicBool,
    lock: Mutex<()>,
    cond: Condvar,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Set the flag and wake the master. Does nothing blocking beyond a
    /// short-held internal lock, so it is usable from minimal contexts.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::Release);
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.cond.notify_all();
    }

    /// Sleep until `deadline` or until triggered. Returns true if the stop
    /// flag was set.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        let mut guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if self.is_set() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return self.is_set();
            }
            let (g, _timeout) = self
                .cond
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(|e| e.into_inner());
            guard = g;
        }
    }
}

/// The master tick loop, run on its own thread.
pub(crate) struct MasterClock {
    interval: Duration,
    shutdown: Arc<Shutdown>,
    tick_counter: Arc<AtomicU64>,
    /// (sequence divider, release slot) per service, registration order.
    slots: Vec<(u64, Arc<ReleaseSlot>)>,
}

impl MasterClock {
    pub fn new(
        interval: Duration,
        shutdown: Arc<Shutdown>,
        tick_counter: Arc<AtomicU64>,
        slots: Vec<(u64, Arc<ReleaseSlot>)>,
    ) -> Self {
        Self {
            interval,
            shutdown,
            tick_counter,
            slots,
        }
    }

    pub fn run(self) {
        let origin = Instant::now();
        let interval_ns = self.interval.as_nanos() as u64;
        let mut tick: u64 = 0;

        log::info!(
            "master clock running: interval={:?}, {} service(s)",
            self.interval,
            self.slots.len()
        );

        loop {
            tick += 1;
            let deadline = origin + Duration::from_nanos(interval_ns * tick);
            if self.shutdown.wait_until(deadline) {
                break;
            }

            self.tick_counter.store(tick, Ordering::Relaxed);
            for (divider, slot) in &self.slots {
                if tick % divider == 0 {
                    slot.release();
                }
            }
        }

        log::info!("master clock stopped after {} tick(s)", tick - 1);
    }
}
