//! Interruption policies.
//!
//! ## Contents
//! - [`InterruptLevel`] what the unwinding iteration may still do after a pause/stop request
//!
//! ## Quick wiring
//! ```text
//! Service::pause_with(level, wait) / Service::stop_with(level, wait)
//!      └─► core::status stores the level
//!           └─► core::worker consults runs_events()/runs_execute() at each checkpoint
//! ```
//!
//! ## Defaults
//! - `pause()`/`stop()` use `ServiceConfig::default_interrupt` (`Immediate`).
//! - A running or resumed service carries `InterruptLevel::None`.

mod interrupt;

pub use interrupt::InterruptLevel;
