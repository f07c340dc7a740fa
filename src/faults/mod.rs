//! Service faults: record type and broadcast bus.
//!
//! ## Contents
//! - [`Fault`] what went wrong, where and when
//! - [`FaultBus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Service::start` (spawn failure), the worker (listener panics).
//! - **Consumers**: anything holding `Service::subscribe_faults()`.

mod bus;
mod fault;

pub use bus::FaultBus;
pub use fault::Fault;
