//! Single-method event admission.

use super::EventQueue;

/// Something that accepts events of type `E`.
///
/// Implemented by [`Service`](crate::Service) and [`EventQueue`]; useful for
/// producers that should not see the control surface.
pub trait EventSink<E> {
    /// Offers an event; returns whether it was accepted.
    fn add_event(&self, event: E) -> bool;
}

impl<E> EventSink<E> for EventQueue<E> {
    /// Accepts unless the queue is at capacity.
    fn add_event(&self, event: E) -> bool {
        self.offer(event).is_ok()
    }
}
