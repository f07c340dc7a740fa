//! # Fault bus.
//!
//! [`FaultBus`] is a thin wrapper around [`tokio::sync::broadcast`] carrying
//! [`Fault`] records from the worker thread (and from `start`) to any number of
//! observers.
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks; no runtime is required.
//! - **Bounded capacity**: a ring buffer keeps the most recent `capacity` faults.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: faults published with no receiver are dropped
//!   (the service still keeps the latest one, see `Service::last_fault`).
//!
//! Receivers can be drained synchronously with `try_recv()` or awaited with
//! `recv().await` inside a tokio runtime.

use tokio::sync::broadcast;

use super::fault::Fault;

/// Broadcast channel for service faults.
#[derive(Clone, Debug)]
pub struct FaultBus {
    tx: broadcast::Sender<Fault>,
}

impl FaultBus {
    /// Creates a bus with the given capacity (clamped to at least 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes a fault to all current receivers.
    pub fn publish(&self, fault: Fault) {
        let _ = self.tx.send(fault);
    }

    /// Subscribes to faults published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Fault> {
        self.tx.subscribe()
    }

    /// Number of live receivers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::broadcast::error::TryRecvError;

    use super::*;
    use crate::error::ServiceError;

    #[test]
    fn test_publish_reaches_subscribers_without_runtime() {
        let bus = FaultBus::new(0);
        bus.publish(Fault::new("early", ServiceError::SpawnFailed { reason: "x".into() }));

        let mut rx = bus.subscribe();
        assert_eq!(bus.receiver_count(), 1);
        bus.publish(Fault::new("late", ServiceError::SpawnFailed { reason: "y".into() }));

        let got = rx.try_recv().unwrap();
        assert_eq!(got.service.as_ref(), "late");
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }
}
