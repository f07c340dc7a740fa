//! # Service configuration.
//!
//! Provides [`ServiceConfig`], the centralized settings a [`Service`](crate::Service)
//! is built from. Every value can be changed later through the service's
//! setters; the config only seeds the initial values.
//!
//! ## Sentinel values
//! - `remaining_* = None` → unlimited
//! - `queue_capacity = 0` → unbounded queue
//! - `poll_timeout = 0s` → a blocking poll waits until an item arrives or it is woken

use std::time::Duration;

use crate::error::ServiceError;
use crate::policies::InterruptLevel;

/// Configuration for a single service.
///
/// ## Field semantics
/// - `name`: service name, used for the worker thread name and in logs
/// - `blocking`: whether the worker parks in `poll()` while the queue is empty
/// - `queue_capacity`: capacity of the internal queue (`0` = unbounded)
/// - `poll_timeout`: bound on a blocking poll (`0s` = until item or wakeup)
/// - `remaining_events` / `remaining_executes` / `remaining_iterations`:
///   budgets after which the service stops on its own (`None` = unlimited)
/// - `accepts_events` / `events_active` / `execute_active`: initial flags
/// - `default_interrupt`: level used by `pause()` and `stop()`
/// - `fault_capacity`: fault bus ring buffer size (min 1)
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// Name of the service.
    pub name: String,

    /// Whether polls on the internal queue block while it is empty.
    ///
    /// Ignored when the builder is given a pre-built queue; that queue keeps its own mode.
    pub blocking: bool,

    /// Capacity of the internal queue.
    ///
    /// - `0` = unbounded, `offer` always succeeds
    /// - `n > 0` = `offer` rejects once `n` items are pending
    pub queue_capacity: usize,

    /// Upper bound for a single blocking poll.
    ///
    /// When it elapses the poll yields nothing, the drain ends and the
    /// iteration moves on to execute. `Duration::ZERO` waits without bound.
    pub poll_timeout: Duration,

    /// Number of events to dispatch before stopping automatically.
    pub remaining_events: Option<u64>,

    /// Number of execute calls before stopping automatically.
    pub remaining_executes: Option<u64>,

    /// Number of servicing iterations before stopping automatically.
    pub remaining_iterations: Option<u64>,

    /// Whether `add_event` admits new events.
    pub accepts_events: bool,

    /// Whether the worker drains and dispatches events.
    pub events_active: bool,

    /// Whether the worker runs the execute hook every iteration.
    pub execute_active: bool,

    /// Level used by the parameterless `pause()` and `stop()`.
    pub default_interrupt: InterruptLevel,

    /// Capacity of the fault bus broadcast channel.
    pub fault_capacity: usize,
}

impl ServiceConfig {
    /// Creates the default configuration with the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns the queue capacity as an `Option`.
    ///
    /// - `None` → unbounded
    /// - `Some(n)` → at most `n` pending events
    #[inline]
    pub fn capacity_limit(&self) -> Option<usize> {
        if self.queue_capacity == 0 {
            None
        } else {
            Some(self.queue_capacity)
        }
    }

    /// Returns the blocking poll bound as an `Option`.
    #[inline]
    pub fn poll_limit(&self) -> Option<Duration> {
        if self.poll_timeout == Duration::ZERO {
            None
        } else {
            Some(self.poll_timeout)
        }
    }

    /// Returns a fault bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn fault_capacity_clamped(&self) -> usize {
        self.fault_capacity.max(1)
    }

    /// Checks values that would otherwise fail later on the worker thread.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.name.trim().is_empty() {
            return Err(ServiceError::InvalidConfig {
                field: "name",
                reason: "must not be empty".into(),
            });
        }
        if self.name.contains('\0') {
            return Err(ServiceError::InvalidConfig {
                field: "name",
                reason: "must not contain NUL bytes".into(),
            });
        }
        Ok(())
    }
}

impl Default for ServiceConfig {
    /// Default configuration:
    ///
    /// - `name = "service"`
    /// - `blocking = false`, `queue_capacity = 0` (unbounded), `poll_timeout = 0s`
    /// - all budgets unlimited
    /// - accepts, drains events and executes
    /// - `default_interrupt = Immediate`
    /// - `fault_capacity = 64`
    fn default() -> Self {
        Self {
            name: "service".to_string(),
            blocking: false,
            queue_capacity: 0,
            poll_timeout: Duration::ZERO,
            remaining_events: None,
            remaining_executes: None,
            remaining_iterations: None,
            accepts_events: true,
            events_active: true,
            execute_active: true,
            default_interrupt: InterruptLevel::Immediate,
            fault_capacity: 64,
        }
    }
}
