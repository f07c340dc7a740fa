//! # Service listener trait.
//!
//! Provides [`ServiceListener`], the extension point for observing a service's
//! lifecycle and handling its events.
//!
//! ## Rules
//! - Every hook runs on the service's worker thread, synchronously.
//! - Hooks of different listeners never run concurrently with each other.
//! - Listeners are invoked in registration order.
//! - All hooks have empty default bodies, so a listener only implements what it needs.
//! - A panic inside a hook aborts the current run (see [`ServiceError::ListenerPanicked`](crate::ServiceError::ListenerPanicked)).
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use serviceloop::{Service, ServiceListener};
//!
//! #[derive(Default)]
//! struct Counter(AtomicUsize);
//!
//! impl ServiceListener<String> for Counter {
//!     fn on_event(&self, _service: &Service<String>, _event: &String) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//!
//!     fn name(&self) -> &'static str { "counter" }
//! }
//! ```

use std::fmt;

use crate::core::Service;
use crate::policies::InterruptLevel;

/// Observer of a service; all hooks are invoked on the worker thread.
pub trait ServiceListener<E>: Send + Sync + 'static {
    /// Worker thread entered, before the first iteration.
    fn on_start(&self, _service: &Service<E>) {}

    /// One event taken from the queue.
    fn on_event(&self, _service: &Service<E>, _event: &E) {}

    /// Periodic action, once per iteration while execution is active.
    fn on_execute(&self, _service: &Service<E>) {}

    /// Worker reached its checkpoint and is now `Paused`.
    fn on_pause(&self, _service: &Service<E>, _level: InterruptLevel) {}

    /// Worker left the pause; `level` is the one the pause was requested with.
    fn on_resume(&self, _service: &Service<E>, _level: InterruptLevel) {}

    /// Worker left its loop; `level` caused the stop (`None` when a budget ran out).
    fn on_stop(&self, _service: &Service<E>, _level: InterruptLevel) {}

    /// Listener name used in logs and faults.
    ///
    /// The default uses `type_name::<Self>()`; override it with something short.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Identifies a listener hook in logs and faults.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Hook {
    Start,
    Event,
    Execute,
    Pause,
    Resume,
    Stop,
}

impl Hook {
    pub const fn as_label(self) -> &'static str {
        match self {
            Hook::Start => "on_start",
            Hook::Event => "on_event",
            Hook::Execute => "on_execute",
            Hook::Pause => "on_pause",
            Hook::Resume => "on_resume",
            Hook::Stop => "on_stop",
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}
