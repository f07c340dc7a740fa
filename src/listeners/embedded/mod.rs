//! # Built-in listeners
//!
//! - [`LogWriter`]: traces every hook (demo/debug).

mod log;

pub use log::LogWriter;
