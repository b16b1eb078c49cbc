//! Sequencer lifecycle.
//!
//! Orchestrates registration, validated startup (runner threads with
//! SCHED_FIFO/affinity, then the master clock) and cooperative, idempotent
//! shutdown. Each sequencer instance owns its whole state, so several can
//! coexist in one process and be tested in isolation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::clock::{MasterClock, Shutdown};
use crate::error::{SeqResult, SequencerError};
use crate::registry::ServiceRegistry;
use crate::release::ReleaseSlot;
use crate::rt;
use crate::runner::Runner;
use crate::service::{ServiceHandle, ServiceSpec};
use crate::stats::StatsSnapshot;

/// Lifecycle states. Registration is legal before start only; stop is a
/// no-op outside Running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Configuring,
    Running,
    Stopping,
    Stopped,
}

/// Clonable handle carrying only the flag-set-and-signal part of shutdown,
/// for use from a minimal signal-handling context. The blocking joins stay
/// in [`Sequencer::stop_services`].
#[derive(Clone)]
pub struct StopHandle {
    shutdown: Arc<Shutdown>,
    slots: Vec<Arc<ReleaseSlot>>,
}

impl StopHandle {
    pub fn request_stop(&self) {
        self.shutdown.trigger();
        for slot in &self.slots {
            slot.terminate();
        }
    }
}

/// Periodic service sequencer: one master clock thread releasing one
/// dedicated runner thread per registered service.
pub struct Sequencer {
    state: LifecycleState,
    registry: ServiceRegistry,
    shutdown: Arc<Shutdown>,
    tick_counter: Arc<AtomicU64>,
    master: Option<JoinHandle<()>>,
    runners: Vec<JoinHandle<()>>,
}

impl Sequencer {
    pub fn new() -> Self {
        Self {
            state: LifecycleState::Created,
            registry: ServiceRegistry::new(),
            shutdown: Arc::new(Shutdown::new()),
            tick_counter: Arc::new(AtomicU64::new(0)),
            master: None,
            runners: Vec::new(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LifecycleState::Running
    }

    /// Master ticks completed so far.
    pub fn ticks(&self) -> u64 {
        self.tick_counter.load(Ordering::Relaxed)
    }

    /// Register a service. Legal only before [`start_services`](Self::start_services);
    /// afterwards this fails and leaves the registry unchanged.
    pub fn add_service(&mut self, spec: ServiceSpec) -> SeqResult<ServiceHandle> {
        match self.state {
            LifecycleState::Created | LifecycleState::Configuring => {}
            _ => return Err(SequencerError::AlreadyStarted),
        }
        let handle = self.registry.add(spec)?;
        self.state = LifecycleState::Configuring;
        Ok(handle)
    }

    /// Validate the configuration against `master_interval`, spawn one
    /// runner thread per service plus the master clock thread, and enter
    /// Running. On a configuration error no thread is spawned and the
    /// sequencer stays in Configuring. If the OS rejects a thread spawn
    /// mid-start, the threads spawned so far are rolled back and the
    /// sequencer ends in Stopped.
    pub fn start_services(&mut self, master_interval: Duration) -> SeqResult<()> {
        match self.state {
            LifecycleState::Created | LifecycleState::Configuring => {}
            _ => return Err(SequencerError::AlreadyStarted),
        }

        let dividers = self.registry.sequence_dividers(master_interval)?;

        // Page faults in the tick path are latency; locking is best-effort
        if let Err(e) = rt::lock_memory() {
            log::warn!("sequencer: {}", e);
        }

        log::info!(
            "starting {} service(s) at master interval {:?}",
            self.registry.len(),
            master_interval
        );

        let mut to_spawn = Vec::with_capacity(self.registry.len());
        for entry in self.registry.entries_mut() {
            // Callbacks are present until the first successful take
            let callback = match entry.callback.take() {
                Some(c) => c,
                None => return Err(SequencerError::AlreadyStarted),
            };
            to_spawn.push(Runner {
                name: entry.name.clone(),
                callback,
                priority: entry.priority,
                affinity: entry.affinity,
                slot: entry.slot.clone(),
                stats: entry.stats.clone(),
            });
        }

        for runner in to_spawn {
            let thread_name = format!("seq-{}", runner.name);
            match std::thread::Builder::new()
                .name(thread_name)
                .spawn(move || runner.run())
            {
                Ok(h) => self.runners.push(h),
                Err(e) => {
                    // Roll back the already-spawned runners before failing
                    self.abort_spawned();
                    return Err(SequencerError::Spawn(e));
                }
            }
        }

        let clock = MasterClock::new(
            master_interval,
            self.shutdown.clone(),
            self.tick_counter.clone(),
            self.registry
                .entries()
                .iter()
                .zip(dividers)
                .map(|(entry, divider)| (divider, entry.slot.clone()))
                .collect(),
        );
        match std::thread::Builder::new()
            .name("seq-master".to_string())
            .spawn(move || clock.run())
        {
            Ok(h) => self.master = Some(h),
            Err(e) => {
                self.abort_spawned();
                return Err(SequencerError::Spawn(e));
            }
        }

        self.state = LifecycleState::Running;
        Ok(())
    }

    /// Cooperative shutdown: signal every blocked thread once, then join the
    /// master and all runners in registration order. Idempotent; a no-op
    /// unless Running. A callback that never returns blocks this call, by
    /// design of cooperative cancellation.
    pub fn stop_services(&mut self) {
        if self.state != LifecycleState::Running {
            return;
        }
        self.state = LifecycleState::Stopping;
        log::info!("stopping sequencer");

        self.stop_handle().request_stop();

        if let Some(master) = self.master.take() {
            let _ = master.join();
        }
        for runner in self.runners.drain(..) {
            let _ = runner.join();
        }

        self.state = LifecycleState::Stopped;
        log::info!("sequencer stopped after {} tick(s)", self.ticks());
    }

    /// Signal-safe stop handle; see [`StopHandle`].
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            shutdown: self.shutdown.clone(),
            slots: self
                .registry
                .entries()
                .iter()
                .map(|e| e.slot.clone())
                .collect(),
        }
    }

    /// Snapshot one service's statistics. Usable in any lifecycle state;
    /// None for an unknown handle.
    pub fn statistics(&self, handle: ServiceHandle) -> Option<StatsSnapshot> {
        let entry = self.registry.get(handle)?;
        let stats = entry.stats.lock().unwrap_or_else(|e| e.into_inner());
        Some(StatsSnapshot::from_stats(
            &entry.name,
            &stats,
            entry.slot.overruns(),
        ))
    }

    /// Snapshots for every registered service, registration order.
    pub fn all_statistics(&self) -> Vec<StatsSnapshot> {
        self.registry
            .entries()
            .iter()
            .map(|entry| {
                let stats = entry.stats.lock().unwrap_or_else(|e| e.into_inner());
                StatsSnapshot::from_stats(&entry.name, &stats, entry.slot.overruns())
            })
            .collect()
    }

    /// Terminate and join whatever was spawned during a failed start. The
    /// callbacks are already consumed at this point, so the sequencer ends
    /// in Stopped rather than pretending to be configurable again.
    fn abort_spawned(&mut self) {
        self.shutdown.trigger();
        for entry in self.registry.entries() {
            entry.slot.terminate();
        }
        if let Some(master) = self.master.take() {
            let _ = master.join();
        }
        for runner in self.runners.drain(..) {
            let _ = runner.join();
        }
        self.state = LifecycleState::Stopped;
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Sequencer {
    fn drop(&mut self) {
        self.stop_services();
    }
}
