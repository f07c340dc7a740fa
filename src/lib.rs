//! # serviceloop
//!
//! **serviceloop** is a small engine for restartable background services.
//!
//! A [`Service`] runs a dedicated worker thread that drains an event queue and
//! performs a periodic action, while any number of control threads start,
//! pause, resume and stop it. Behavior is plugged in through
//! [`ServiceListener`]s; the engine itself only owns lifecycle, interruption
//! and dispatch.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   control threads                       producers
//!   start / pause / resume / stop         add_event(e)
//!        │                                     │
//!        ▼                                     ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Service                                                          │
//! │  - StateRegister (Stopped/Running/Pausing/Paused/Stopping + wait) │
//! │  - InterruptGate (one controller interrupts, worker never blocks) │
//! │  - EventQueue    (FIFO, optional blocking poll, capacity)         │
//! │  - Budgets       (remaining events / executes / iterations)       │
//! │  - ListenerSet   (copy-on-write, registration order)              │
//! │  - FaultBus      (broadcast of listener panics / spawn failures)  │
//! └──────┬────────────────────────────────────────────────────────────┘
//!        ▼
//!   worker thread (one per run)
//!        │ on_start
//!        │ loop { drain events ─► on_event ; execute ─► on_execute ; checkpoint }
//!        │ on_stop(level)
//!        ▼
//!   listeners l1 ─► l2 ─► ... ─► lN
//! ```
//!
//! ### Lifecycle
//! ```text
//! Stopped ──start──► Running ──pause──► Pausing ──checkpoint──► Paused
//!    ▲                  ▲                                         │
//!    │                  └──────────────── resume ─────────────────┘
//!    │
//!    └── worker leaves loop ◄── Stopping ◄── stop (from Running, Pausing or Paused)
//!                          ◄── budget used up / listener panic (from Running)
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                          |
//! |-------------------|---------------------------------------------------------------|---------------------------------------------|
//! | **Service**       | Control API, introspection, budgets and flags.                | [`Service`], [`ServiceBuilder`]             |
//! | **Listeners**     | Lifecycle and event hooks run on the worker thread.           | [`ServiceListener`], [`ServiceHandler`]     |
//! | **Interruption**  | How much work may still run while pausing or stopping.        | [`InterruptLevel`], [`Wait`]                |
//! | **Primitives**    | State register and interrupt gate usable on their own.        | [`StateRegister`], [`InterruptGate`]        |
//! | **Queue**         | FIFO with blocking poll, wakeups, capacity and poll timeout.  | [`EventQueue`], [`EventSink`]               |
//! | **Faults**        | Typed errors published on a broadcast bus.                    | [`ServiceError`], [`Fault`], [`FaultBus`]   |
//! | **Configuration** | Centralized initial settings.                                 | [`ServiceConfig`]                           |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] listener _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use serviceloop::{LifecycleState, Service, ServiceConfig, ServiceListener};
//!
//! #[derive(Default)]
//! struct Printer(AtomicUsize);
//!
//! impl ServiceListener<String> for Printer {
//!     fn on_event(&self, _service: &Service<String>, event: &String) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         println!("got {event}");
//!     }
//! }
//!
//! let mut cfg = ServiceConfig::named("printer");
//! cfg.blocking = true;
//! cfg.execute_active = false;
//! cfg.remaining_events = Some(2);
//!
//! let printer = Arc::new(Printer::default());
//! let service = Service::<String>::builder(cfg)
//!     .with_listener(printer.clone())
//!     .build()
//!     .expect("valid config");
//!
//! service.add_event("hello".to_string());
//! service.add_event("world".to_string());
//! assert!(service.start());
//!
//! // The service stops on its own once both events are dispatched.
//! service.join();
//! assert_eq!(printer.0.load(Ordering::SeqCst), 2);
//! assert_eq!(service.state(), LifecycleState::Stopped);
//! ```
mod config;
mod core;
mod error;
mod faults;
mod listeners;
mod policies;
mod queue;

// ---- Public re-exports ----

pub use config::ServiceConfig;
pub use core::{
    GateEntry, GateGuard, InterruptGate, LifecycleState, Service, ServiceBuilder, StateGuard,
    StateRegister, StateSet, Wait, Wakeable,
};
pub use error::ServiceError;
pub use faults::{Fault, FaultBus};
pub use listeners::{HandlerListener, Hook, ListenerSet, ServiceHandler, ServiceListener};
pub use policies::InterruptLevel;
pub use queue::{EventQueue, EventSink};

// Optional: expose a simple built-in logger listener (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use listeners::LogWriter;
