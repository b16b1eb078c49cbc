//! Sequencer error types.
//!
//! Configuration problems surface synchronously through [`SequencerError`].
//! Denied real-time privileges and runtime overruns are deliberately not in
//! this enum: the sequencer degrades or records them instead of failing.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SequencerError {
    #[error("service '{name}': period must be greater than zero")]
    InvalidPeriod { name: String },

    #[error("service '{name}': priority {priority} outside SCHED_FIFO range 1..=99")]
    InvalidPriority { name: String, priority: i32 },

    #[error("service '{name}': CPU core {core} not present (host has {available})")]
    InvalidAffinity {
        name: String,
        core: usize,
        available: usize,
    },

    #[error("master interval must be greater than zero")]
    InvalidMasterInterval,

    #[error("period of [{names}] is not an exact multiple of the master interval {interval:?}")]
    PeriodNotDivisible { names: String, interval: Duration },

    #[error("sequencer already started; registration is only valid while configuring")]
    AlreadyStarted,

    #[error("failed to spawn thread: {0}")]
    Spawn(#[from] std::io::Error),
}

pub type SeqResult<T> = Result<T, SequencerError>;
