//! # Fault records published by a service.
//!
//! A [`Fault`] is emitted when something goes wrong outside the caller's
//! control flow: the worker thread could not be spawned, or a listener
//! panicked on the worker thread and the run was aborted.
//!
//! ## Ordering guarantees
//! Each fault has a globally unique sequence number (`seq`) that increases
//! monotonically across all services in the process.
//!
//! ## Example
//! ```rust
//! use serviceloop::{Fault, ServiceError};
//!
//! let fault = Fault::new("poller", ServiceError::SpawnFailed { reason: "EAGAIN".into() });
//! assert_eq!(fault.service.as_ref(), "poller");
//! assert_eq!(fault.label(), "service_spawn_failed");
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

use crate::error::ServiceError;
use crate::listeners::Hook;

/// Global sequence counter for fault ordering.
static FAULT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Something that went wrong on or around the worker thread.
#[derive(Clone, Debug)]
pub struct Fault {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Name of the service that produced the fault.
    pub service: Arc<str>,
    /// Run number (1-based start count) during which it happened, if known.
    pub run: Option<u64>,
    /// What happened.
    pub error: ServiceError,
}

impl Fault {
    /// Creates a fault with the current timestamp and next sequence number.
    pub fn new(service: impl Into<Arc<str>>, error: ServiceError) -> Self {
        Self {
            seq: FAULT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            service: service.into(),
            run: None,
            error,
        }
    }

    /// Attaches the run number.
    #[inline]
    pub fn with_run(mut self, run: u64) -> Self {
        self.run = Some(run);
        self
    }

    /// Stable label of the underlying error.
    #[inline]
    pub fn label(&self) -> &'static str {
        self.error.as_label()
    }

    /// Hook that panicked, for listener faults.
    pub fn hook(&self) -> Option<Hook> {
        match &self.error {
            ServiceError::ListenerPanicked { hook, .. } => Some(*hook),
            _ => None,
        }
    }

    #[inline]
    pub fn is_listener_panic(&self) -> bool {
        matches!(self.error, ServiceError::ListenerPanicked { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Fault::new("s", ServiceError::SpawnFailed { reason: "x".into() });
        let b = Fault::new("s", ServiceError::SpawnFailed { reason: "y".into() });
        assert!(b.seq > a.seq);
        assert_eq!(a.hook(), None);
        assert!(!a.is_listener_panic());
    }

    #[test]
    fn test_listener_fault_exposes_hook() {
        let fault = Fault::new(
            "s",
            ServiceError::ListenerPanicked {
                listener: "l",
                hook: Hook::Pause,
                reason: "boom".into(),
            },
        )
        .with_run(3);
        assert_eq!(fault.hook(), Some(Hook::Pause));
        assert_eq!(fault.run, Some(3));
        assert!(fault.is_listener_panic());
    }
}
