//! Service registry.
//!
//! Ordered table of registered services. Appended to while configuring,
//! immutable once the sequencer is running; divisibility against the master
//! interval is only checkable at start time and is validated there.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{SeqResult, SequencerError};
use crate::release::ReleaseSlot;
use crate::rt;
use crate::service::{ServiceCallback, ServiceHandle, ServiceSpec};
use crate::stats::ServiceStats;

pub(crate) struct ServiceEntry {
    pub name: String,
    /// Taken by the runner thread at start; None afterwards.
    pub callback: Option<ServiceCallback>,
    pub priority: i32,
    pub affinity: usize,
    pub period: Duration,
    pub slot: Arc<ReleaseSlot>,
    pub stats: Arc<Mutex<ServiceStats>>,
}

#[derive(Default)]
pub(crate) struct ServiceRegistry {
    entries: Vec<ServiceEntry>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and append one service, synthesizing a name if none given.
    pub fn add(&mut self, spec: ServiceSpec) -> SeqResult<ServiceHandle> {
        let index = self.entries.len();
        let name = spec
            .name
            .unwrap_or_else(|| format!("service-{}", index));

        if spec.period.is_zero() {
            return Err(SequencerError::InvalidPeriod { name });
        }
        if !(1..=99).contains(&spec.priority) {
            return Err(SequencerError::InvalidPriority {
                name,
                priority: spec.priority,
            });
        }
        let available = rt::num_cores();
        if spec.affinity >= available {
            return Err(SequencerError::InvalidAffinity {
                name,
                core: spec.affinity,
                available,
            });
        }

        log::info!(
            "registered service '{}' (period={:?}, priority={}, cpu={})",
            name,
            spec.period,
            spec.priority,
            spec.affinity
        );

        self.entries.push(ServiceEntry {
            name,
            callback: Some(spec.callback),
            priority: spec.priority,
            affinity: spec.affinity,
            period: spec.period,
            slot: Arc::new(ReleaseSlot::new()),
            stats: Arc::new(Mutex::new(ServiceStats::new())),
        });
        Ok(ServiceHandle(index))
    }

    /// Check every period against the master interval and compute the
    /// sequence dividers. Fails naming all offending services at once.
    pub fn sequence_dividers(&self, interval: Duration) -> SeqResult<Vec<u64>> {
        if interval.is_zero() {
            return Err(SequencerError::InvalidMasterInterval);
        }

        let interval_ns = interval.as_nanos();
        let offending: Vec<&str> = self
            .entries
            .iter()
            .filter(|e| e.period.as_nanos() % interval_ns != 0)
            .map(|e| e.name.as_str())
            .collect();

        if !offending.is_empty() {
            return Err(SequencerError::PeriodNotDivisible {
                names: offending.join(", "),
                interval,
            });
        }

        Ok(self
            .entries
            .iter()
            .map(|e| (e.period.as_nanos() / interval_ns) as u64)
            .collect())
    }

    pub fn entries(&self) -> &[ServiceEntry] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut [ServiceEntry] {
        &mut self.entries
    }

    pub fn get(&self, handle: ServiceHandle) -> Option<&ServiceEntry> {
        self.entries.get(handle.0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
