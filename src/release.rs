//! Release slot - the master/runner handshake primitive.
//!
//! One slot is shared between the master clock and a single runner thread.
//! A release arriving while the runner is busy (or while one is already
//! pending) coalesces into a single pending release and counts as an
//! overrun; releases never queue beyond one.

use std::sync::{Condvar, Mutex, MutexGuard};

/// Why a blocked runner woke up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    Release,
    Terminate,
}

#[derive(Debug, Default)]
struct SlotState {
    pending: bool,
    in_flight: bool,
    terminate: bool,
    releases: u64,
    overruns: u64,
}

/// Mutex + condvar slot signalled by the master, awaited by one runner.
#[derive(Debug, Default)]
pub struct ReleaseSlot {
    state: Mutex<SlotState>,
    cond: Condvar,
}

impl ReleaseSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        // A runner that panicked mid-callback poisons the mutex; the
        // counters inside remain valid, so keep going.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Signal the runner that its service is due. Called by the master.
    pub fn release(&self) {
        let mut st = self.lock();
        st.releases += 1;
        if st.pending || st.in_flight {
            st.overruns += 1;
        }
        st.pending = true;
        self.cond.notify_one();
    }

    /// Request cooperative termination and wake the runner if blocked.
    pub fn terminate(&self) {
        let mut st = self.lock();
        st.terminate = true;
        self.cond.notify_one();
    }

    /// Block until released or terminated. Termination wins even when a
    /// release is pending: the runner exits without invoking the callback.
    pub fn wait(&self) -> Wake {
        let mut st = self.lock();
        loop {
            if st.terminate {
                return Wake::Terminate;
            }
            if st.pending {
                st.pending = false;
                st.in_flight = true;
                return Wake::Release;
            }
            st = self.cond.wait(st).unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Mark the in-flight invocation as finished. Called by the runner
    /// right after the callback returns.
    pub fn complete(&self) {
        self.lock().in_flight = false;
    }

    pub fn overruns(&self) -> u64 {
        self.lock().overruns
    }

    pub fn releases(&self) -> u64 {
        self.lock().releases
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_then_wait() {
        let slot = ReleaseSlot::new();
        slot.release();
        assert_eq!(slot.wait(), Wake::Release);
        assert_eq!(slot.overruns(), 0);
        slot.complete();
    }

    #[test]
    fn test_double_release_coalesces() {
        let slot = ReleaseSlot::new();
        slot.release();
        slot.release();
        assert_eq!(slot.overruns(), 1);

        // Only one wake is pending
        assert_eq!(slot.wait(), Wake::Release);
        slot.complete();
        slot.terminate();
        assert_eq!(slot.wait(), Wake::Terminate);
    }

    #[test]
    fn test_release_while_in_flight_is_overrun() {
        let slot = ReleaseSlot::new();
        slot.release();
        assert_eq!(slot.wait(), Wake::Release);

        // Runner has not called complete() yet: next release overruns
        slot.release();
        assert_eq!(slot.overruns(), 1);
        slot.complete();

        // The coalesced release still runs exactly once
        assert_eq!(slot.wait(), Wake::Release);
        slot.complete();
    }

    #[test]
    fn test_terminate_wins_over_pending_release() {
        let slot = ReleaseSlot::new();
        slot.release();
        slot.terminate();
        assert_eq!(slot.wait(), Wake::Terminate);
    }

    #[test]
    fn test_terminate_wakes_blocked_waiter() {
        use std::sync::Arc;
        let slot = Arc::new(ReleaseSlot::new());
        let waiter = {
            let slot = slot.clone();
            std::thread::spawn(move || slot.wait())
        };
        std::thread::sleep(std::time::Duration::from_millis(50));
        slot.terminate();
        assert_eq!(waiter.join().unwrap(), Wake::Terminate);
    }
}
