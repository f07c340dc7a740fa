//! # Listeners: fan-out of lifecycle hooks and events.
//!
//! This module provides the [`ServiceListener`] trait, the [`ListenerSet`]
//! registry the worker dispatches through, and adapters.
//!
//! ## Architecture
//! ```text
//! worker thread
//!   │ dispatch(Hook::Event)
//!   ▼
//! ListenerSet (snapshot, registration order)
//!   ├──► listener 1 .on_event(&service, &event)
//!   ├──► listener 2 .on_event(&service, &event)
//!   └──► HandlerListener<H> ──► H::on_event(&event)
//! ```
//!
//! ## Contents
//! - [`ServiceListener`] six hooks, all with no-op defaults
//! - [`ListenerSet`] copy-on-write, order-preserving registry
//! - [`ServiceHandler`] / [`HandlerListener`] composition wrapper
//! - `LogWriter` (feature `logging`) hook tracer

#[cfg(feature = "logging")]
mod embedded;
mod handler;
mod listener;
mod set;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use handler::{HandlerListener, ServiceHandler};
pub use listener::{Hook, ServiceListener};
pub use set::ListenerSet;
