//! # ListenerSet: ordered, copy-on-write listener registry.
//!
//! [`ListenerSet`] keeps listeners in registration order and lets controllers
//! add or remove them while the worker is dispatching.
//!
//! ## Architecture
//! ```text
//! add / remove ──► RwLock<Arc<Vec<listener>>>   (writers clone the Vec, swap the Arc)
//!                              │
//! dispatch(hook) ──► snapshot (Arc clone) ──► l1.hook() ─► l2.hook() ─► ... ─► lN.hook()
//!                                                └─ panic caught, first one returned as error
//! ```
//!
//! ## Rules
//! - A dispatch sees the set as it was when the dispatch began.
//! - Dispatch is synchronous, on the caller's thread, in registration order.
//! - A panicking listener does not prevent later listeners from receiving the
//!   same hook; the first panic is reported as [`ServiceError::ListenerPanicked`].
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave a listener's own
//! state inconsistent if it panics while holding a lock.

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::ServiceError;

use super::listener::{Hook, ServiceListener};

type ListenerRef<E> = Arc<dyn ServiceListener<E>>;

/// Registration-ordered set of listeners.
pub struct ListenerSet<E> {
    listeners: RwLock<Arc<Vec<ListenerRef<E>>>>,
}

impl<E: 'static> ListenerSet<E> {
    /// Creates a set with the given listeners, in order.
    #[must_use]
    pub fn new(listeners: Vec<ListenerRef<E>>) -> Self {
        Self {
            listeners: RwLock::new(Arc::new(listeners)),
        }
    }

    /// Appends a listener.
    pub fn add(&self, listener: ListenerRef<E>) {
        self.update(|list| list.push(listener));
    }

    /// Removes a listener by identity. Returns whether it was present.
    pub fn remove(&self, listener: &ListenerRef<E>) -> bool {
        let mut removed = false;
        self.update(|list| {
            if let Some(pos) = list.iter().position(|l| same(l, listener)) {
                list.remove(pos);
                removed = true;
            }
        });
        removed
    }

    /// Whether this exact listener is registered.
    pub fn contains(&self, listener: &ListenerRef<E>) -> bool {
        self.snapshot().iter().any(|l| same(l, listener))
    }

    /// Removes every listener.
    pub fn clear(&self) {
        self.update(Vec::clear);
    }

    /// Current listeners, in order.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Vec<ListenerRef<E>>> {
        Arc::clone(
            &self
                .listeners
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    /// Names of the current listeners, in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.snapshot().iter().map(|l| l.name()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    fn update(&self, f: impl FnOnce(&mut Vec<ListenerRef<E>>)) {
        let mut guard = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let mut next = Vec::clone(&guard);
        f(&mut next);
        *guard = Arc::new(next);
    }

    /// Invokes `call` on every listener of the current snapshot, in order.
    pub(crate) fn dispatch(
        &self,
        hook: Hook,
        mut call: impl FnMut(&dyn ServiceListener<E>),
    ) -> Result<(), ServiceError> {
        let snapshot = self.snapshot();
        let mut first_panic = None;
        for listener in snapshot.iter() {
            let outcome = catch_unwind(AssertUnwindSafe(|| call(listener.as_ref())));
            if let Err(payload) = outcome {
                let err = ServiceError::ListenerPanicked {
                    listener: listener.name(),
                    hook,
                    reason: panic_message(payload.as_ref()),
                };
                tracing::error!(
                    listener = listener.name(),
                    hook = hook.as_label(),
                    "listener panicked: {}",
                    err.as_message()
                );
                first_panic.get_or_insert(err);
            }
        }
        first_panic.map_or(Ok(()), Err)
    }
}

impl<E: 'static> Default for ListenerSet<E> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<E: 'static> fmt::Debug for ListenerSet<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

fn same<E>(a: &ListenerRef<E>, b: &ListenerRef<E>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Renders a panic payload as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
