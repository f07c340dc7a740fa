//! Runtime core: lifecycle, interruption and the worker loop.
//!
//! The public entry point is [`Service`], built through [`ServiceBuilder`].
//! The remaining public types are the synchronization primitives it is made of,
//! exposed for callers that want to compose their own loops.
//!
//! Internal modules:
//! - [`state`]: lifecycle states, state masks and the waitable state register;
//! - [`gate`]: interrupt gate coordinating controllers with a blocking worker;
//! - [`status`]: lock-free pause/stop flags and countdown budgets;
//! - [`wait`]: how long a control call blocks for its outcome;
//! - [`service`]: control API (start/pause/resume/stop) and introspection;
//! - [`worker`]: the servicing loop of a single run;
//! - [`builder`]: assembles a service from config, queue and listeners.

use std::sync::{Mutex, MutexGuard, PoisonError};

mod builder;
mod gate;
mod service;
mod state;
mod status;
mod wait;
mod worker;

pub use builder::ServiceBuilder;
pub use gate::{GateEntry, GateGuard, InterruptGate, Wakeable};
pub use service::Service;
pub use state::{LifecycleState, StateGuard, StateRegister, StateSet};
pub use wait::Wait;

pub(crate) use wait::Deadline;

/// Locks `mutex`, recovering the data if a holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
