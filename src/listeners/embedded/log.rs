//! # LogWriter: listener that traces every hook
//!
//! A minimal listener that reports each hook through `tracing`.
//! Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! INFO serviceloop: [start] service="poller"
//! INFO serviceloop: [event] service="poller" event="tick 1"
//! INFO serviceloop: [pause] service="poller" level=immediate
//! INFO serviceloop: [resume] service="poller" level=immediate
//! INFO serviceloop: [stop] service="poller" level=execute
//! ```

use std::fmt::Debug;

use tracing::{debug, info};

use crate::core::Service;
use crate::listeners::ServiceListener;
use crate::policies::InterruptLevel;

/// Hook tracer.
#[derive(Debug, Default)]
pub struct LogWriter {
    trace_execute: bool,
}

impl LogWriter {
    /// Construct a new [`LogWriter`]; execute calls are not traced.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Also trace every execute call (at debug level).
    #[must_use]
    pub fn with_execute(mut self) -> Self {
        self.trace_execute = true;
        self
    }
}

impl<E: Debug + Send + 'static> ServiceListener<E> for LogWriter {
    fn on_start(&self, service: &Service<E>) {
        info!(service = service.name(), "[start]");
    }

    fn on_event(&self, service: &Service<E>, event: &E) {
        info!(service = service.name(), event = ?event, "[event]");
    }

    fn on_execute(&self, service: &Service<E>) {
        if self.trace_execute {
            debug!(service = service.name(), "[execute]");
        }
    }

    fn on_pause(&self, service: &Service<E>, level: InterruptLevel) {
        info!(service = service.name(), level = level.as_label(), "[pause]");
    }

    fn on_resume(&self, service: &Service<E>, level: InterruptLevel) {
        info!(service = service.name(), level = level.as_label(), "[resume]");
    }

    fn on_stop(&self, service: &Service<E>, level: InterruptLevel) {
        info!(service = service.name(), level = level.as_label(), "[stop]");
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
