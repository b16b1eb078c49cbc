//! Service descriptors and registration handles.

use std::time::Duration;

/// Opaque zero-argument callback invoked once per release. Any persistent
/// per-service state (a toggle bit, a counter) belongs to the closure, so
/// the same logic can back multiple independently-scheduled services.
pub type ServiceCallback = Box<dyn FnMut() + Send + 'static>;

/// Registration descriptor for one periodic service. Immutable once handed
/// to the sequencer.
pub struct ServiceSpec {
    pub(crate) name: Option<String>,
    pub(crate) callback: ServiceCallback,
    pub(crate) priority: i32,
    pub(crate) affinity: usize,
    pub(crate) period: Duration,
}

impl ServiceSpec {
    /// Describe a service: callback, SCHED_FIFO priority (1-99), CPU core
    /// to pin the runner to, and release period. A name is synthesized at
    /// registration unless [`named`](Self::named) is used.
    pub fn new(
        callback: impl FnMut() + Send + 'static,
        priority: i32,
        affinity: usize,
        period: Duration,
    ) -> Self {
        Self {
            name: None,
            callback: Box::new(callback),
            priority,
            affinity,
            period,
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }
}

/// Handle returned by registration, used to look up statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceHandle(pub(crate) usize);
