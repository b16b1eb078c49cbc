//! Per-service execution statistics.

use std::time::Duration;

/// Running statistics for one service. Mutated only from that service's
/// runner thread; readers take the stats lock for a consistent view.
#[derive(Debug, Clone)]
pub struct ServiceStats {
    pub invocations: u64,
    pub last_elapsed: Duration,
    pub min_elapsed: Duration,
    pub max_elapsed: Duration,
    avg_us: f64,
    /// SCHED_FIFO was actually applied to the runner thread.
    pub fifo_applied: bool,
    /// CPU affinity was actually applied to the runner thread.
    pub affinity_applied: bool,
}

impl ServiceStats {
    pub fn new() -> Self {
        Self {
            invocations: 0,
            last_elapsed: Duration::ZERO,
            min_elapsed: Duration::MAX,
            max_elapsed: Duration::ZERO,
            avg_us: 0.0,
            fifo_applied: false,
            affinity_applied: false,
        }
    }

    /// Record one completed invocation.
    pub fn record(&mut self, elapsed: Duration) {
        self.invocations += 1;
        self.last_elapsed = elapsed;
        self.min_elapsed = self.min_elapsed.min(elapsed);
        self.max_elapsed = self.max_elapsed.max(elapsed);

        // Rolling average
        let us = elapsed.as_micros() as f64;
        self.avg_us += (us - self.avg_us) / self.invocations as f64;
    }

    pub fn avg_elapsed(&self) -> Duration {
        Duration::from_micros(self.avg_us as u64)
    }
}

impl Default for ServiceStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only aggregate over one service's runner statistics and release
/// slot. Eventually consistent: not coupled to any single tick.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct StatsSnapshot {
    pub name: String,
    pub invocations: u64,
    pub overruns: u64,
    pub last_elapsed: Duration,
    pub min_elapsed: Duration,
    pub max_elapsed: Duration,
    pub avg_elapsed: Duration,
    pub fifo_applied: bool,
    pub affinity_applied: bool,
}

impl StatsSnapshot {
    pub(crate) fn from_stats(name: &str, stats: &ServiceStats, overruns: u64) -> Self {
        Self {
            name: name.to_string(),
            invocations: stats.invocations,
            overruns,
            last_elapsed: stats.last_elapsed,
            // Report zero rather than the sentinel when nothing ran yet
            min_elapsed: if stats.invocations == 0 {
                Duration::ZERO
            } else {
                stats.min_elapsed
            },
            max_elapsed: stats.max_elapsed,
            avg_elapsed: stats.avg_elapsed(),
            fifo_applied: stats.fifo_applied,
            affinity_applied: stats.affinity_applied,
        }
    }
}

impl std::fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: invocations={} overruns={} min={:?} max={:?} avg={:?} fifo={} affinity={}",
            self.name,
            self.invocations,
            self.overruns,
            self.min_elapsed,
            self.max_elapsed,
            self.avg_elapsed,
            if self.fifo_applied { "yes" } else { "no" },
            if self.affinity_applied { "yes" } else { "no" },
        )
    }
}
