//! Real-Time Sequencer Crate
//!
//! Drives multiple independently-rated periodic services from a single
//! master clock, with:
//! - One dedicated OS thread per service (SCHED_FIFO priority, CPU pinning)
//! - Drift-free absolute-deadline master ticking
//! - Overrun detection with coalesced releases (never queued beyond one)
//! - Race-free, idempotent startup and shutdown
//!
//! # Example
//!
//! ```rust,ignore
//! use rtsequencer::{Sequencer, ServiceSpec};
//! use std::time::Duration;
//!
//! let mut seq = Sequencer::new();
//! let handle = seq.add_service(
//!     ServiceSpec::new(|| do_control_step(), 99, 0, Duration::from_millis(100))
//!         .named("control-loop"),
//! )?;
//!
//! seq.start_services(Duration::from_millis(10))?;
//! // ...
//! seq.stop_services();
//! println!("{}", seq.statistics(handle).unwrap());
//! ```

mod clock;
mod registry;
mod runner;

pub mod error;
pub mod release;
pub mod rt;
pub mod sequencer;
pub mod service;
pub mod stats;

// Re-exports
pub use error::{SeqResult, SequencerError};
pub use release::{ReleaseSlot, Wake};
pub use rt::{RtError, RtResult};
pub use sequencer::{LifecycleState, Sequencer, StopHandle};
pub use service::{ServiceCallback, ServiceHandle, ServiceSpec};
pub use stats::StatsSnapshot;
