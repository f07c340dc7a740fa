//! # Composition wrapper for self-contained services.
//!
//! A type that *is* the service logic implements [`ServiceHandler`] with plain,
//! parameterless hooks. [`HandlerListener`] adapts it to [`ServiceListener`],
//! and [`ServiceBuilder::with_handler`](crate::ServiceBuilder::with_handler)
//! registers it.
//!
//! ```rust
//! use serviceloop::{Service, ServiceConfig, ServiceHandler, Wait};
//!
//! struct Echo;
//!
//! impl ServiceHandler<String> for Echo {
//!     fn on_event(&self, event: &String) {
//!         println!("echo: {event}");
//!     }
//! }
//!
//! let service = Service::<String>::builder(ServiceConfig::named("echo"))
//!     .with_handler(Echo)
//!     .build()
//!     .unwrap();
//! assert!(service.start());
//! assert!(service.stop_with(serviceloop::InterruptLevel::Execute, Wait::Forever));
//! ```

use crate::core::Service;
use crate::policies::InterruptLevel;

use super::listener::ServiceListener;

/// Service logic expressed as hooks without the service/level parameters.
pub trait ServiceHandler<E>: Send + Sync + 'static {
    /// Handles one event.
    fn on_event(&self, event: &E);

    /// Periodic action.
    fn on_execute(&self) {}

    fn on_start(&self) {}

    fn on_pause(&self) {}

    fn on_resume(&self) {}

    fn on_stop(&self) {}

    /// Name used in logs and faults.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Adapts a [`ServiceHandler`] to a [`ServiceListener`].
#[derive(Debug)]
pub struct HandlerListener<H> {
    handler: H,
}

impl<H> HandlerListener<H> {
    pub fn new(handler: H) -> Self {
        Self { handler }
    }

    /// The wrapped handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }
}

impl<E, H> ServiceListener<E> for HandlerListener<H>
where
    H: ServiceHandler<E>,
{
    fn on_start(&self, _service: &Service<E>) {
        self.handler.on_start();
    }

    fn on_event(&self, _service: &Service<E>, event: &E) {
        self.handler.on_event(event);
    }

    fn on_execute(&self, _service: &Service<E>) {
        self.handler.on_execute();
    }

    fn on_pause(&self, _service: &Service<E>, _level: InterruptLevel) {
        self.handler.on_pause();
    }

    fn on_resume(&self, _service: &Service<E>, _level: InterruptLevel) {
        self.handler.on_resume();
    }

    fn on_stop(&self, _service: &Service<E>, _level: InterruptLevel) {
        self.handler.on_stop();
    }

    fn name(&self) -> &'static str {
        self.handler.name()
    }
}
