use std::collections::VecDeque;
use std::sync::Arc;

use crate::{
    config::ServiceConfig,
    error::ServiceError,
    listeners::{HandlerListener, ServiceHandler, ServiceListener},
    queue::EventQueue,
};

use super::service::Service;

/// Where the service takes its events from.
enum QueueSource<E> {
    /// Fresh queue configured from [`ServiceConfig`].
    Internal,
    /// Fresh unbounded queue seeded with pending items.
    Seeded(VecDeque<E>),
    /// Queue shared with other producers; keeps its own mode and timeout.
    Shared(Arc<EventQueue<E>>),
}

/// Builder for constructing a [`Service`] with listeners and a queue.
pub struct ServiceBuilder<E> {
    cfg: ServiceConfig,
    listeners: Vec<Arc<dyn ServiceListener<E>>>,
    queue: QueueSource<E>,
}

impl<E: Send + 'static> ServiceBuilder<E> {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: ServiceConfig) -> Self {
        Self {
            cfg,
            listeners: Vec::new(),
            queue: QueueSource::Internal,
        }
    }

    /// Appends one listener; listeners are invoked in the order they are added.
    pub fn with_listener(mut self, listener: Arc<dyn ServiceListener<E>>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Appends several listeners.
    pub fn with_listeners(mut self, listeners: Vec<Arc<dyn ServiceListener<E>>>) -> Self {
        self.listeners.extend(listeners);
        self
    }

    /// Appends a handler that does not need the service handle.
    pub fn with_handler<H: ServiceHandler<E>>(self, handler: H) -> Self {
        self.with_listener(Arc::new(HandlerListener::new(handler)))
    }

    /// Seeds the internal queue with `items`, front first.
    ///
    /// The seeded queue is unbounded; `queue_capacity` does not apply.
    pub fn with_source(mut self, items: VecDeque<E>) -> Self {
        self.queue = QueueSource::Seeded(items);
        self
    }

    /// Uses an existing queue, typically shared with other producers.
    ///
    /// `blocking`, `queue_capacity` and `poll_timeout` from the config are ignored.
    pub fn with_queue(mut self, queue: Arc<EventQueue<E>>) -> Self {
        self.queue = QueueSource::Shared(queue);
        self
    }

    /// Validates the config and builds the service in the `Stopped` state.
    pub fn build(self) -> Result<Service<E>, ServiceError> {
        self.cfg.validate()?;

        let queue = match self.queue {
            QueueSource::Internal => Arc::new(match self.cfg.capacity_limit() {
                Some(capacity) => EventQueue::bounded(capacity),
                None => EventQueue::new(),
            }),
            QueueSource::Seeded(items) => Arc::new(EventQueue::from_source(items)),
            QueueSource::Shared(queue) => {
                return Ok(Service::from_parts(&self.cfg, queue, self.listeners));
            }
        };
        queue.set_blocking(self.cfg.blocking);
        queue.set_poll_timeout(self.cfg.poll_limit());

        Ok(Service::from_parts(&self.cfg, queue, self.listeners))
    }
}
