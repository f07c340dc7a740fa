//! Event queue and event admission.
//!
//! ## Contents
//! - [`EventQueue`] blockable FIFO drained by the worker
//! - [`EventSink`] single-method admission interface
//!
//! A queue is either owned by one service or shared (`Arc<EventQueue<E>>`)
//! between several producers and consumers; a service never assumes it is the
//! only consumer of a shared queue.

mod event_queue;
mod sink;

pub use event_queue::EventQueue;
pub use sink::EventSink;
