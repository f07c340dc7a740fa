//! # Blockable FIFO event queue.
//!
//! [`EventQueue`] is a multi-producer FIFO whose `poll` either returns at once
//! or parks the caller until an item arrives, depending on its blocking mode.
//!
//! ## Rules
//! - `offer` never blocks; with a capacity it rejects (and hands the item back) when full.
//! - `poll` in blocking mode returns `None` only when woken by [`EventQueue::wakeup`],
//!   when its poll timeout elapses, or when blocking is switched off.
//! - `wakeup` affects polls that are in progress, not later ones.
//! - No priority, no deduplication.
//!
//! ```
//! use serviceloop::EventQueue;
//!
//! let queue = EventQueue::bounded(2);
//! assert!(queue.offer("a").is_ok());
//! assert!(queue.offer("b").is_ok());
//! assert_eq!(queue.offer("c"), Err("c"));
//! assert_eq!(queue.poll(), Some("a"));
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::core::{Deadline, Wakeable};

struct QueueInner<E> {
    items: VecDeque<E>,
    /// Bumped by every `wakeup`; a poll that sees it change returns empty.
    wakeups: u64,
    poll_timeout: Option<Duration>,
}

/// Thread-safe FIFO with togglable blocking polls.
pub struct EventQueue<E> {
    inner: Mutex<QueueInner<E>>,
    available: Condvar,
    blocking: AtomicBool,
    capacity: Option<usize>,
}

impl<E> EventQueue<E> {
    /// Creates an unbounded, non-blocking queue.
    pub fn new() -> Self {
        Self::from_parts(VecDeque::new(), None)
    }

    /// Creates a queue that rejects offers once `capacity` items are pending.
    ///
    /// A capacity of `0` means unbounded.
    pub fn bounded(capacity: usize) -> Self {
        Self::from_parts(VecDeque::new(), (capacity > 0).then_some(capacity))
    }

    /// Creates an unbounded queue seeded with `source`, front first.
    pub fn from_source(source: VecDeque<E>) -> Self {
        Self::from_parts(source, None)
    }

    fn from_parts(items: VecDeque<E>, capacity: Option<usize>) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                items,
                wakeups: 0,
                poll_timeout: None,
            }),
            available: Condvar::new(),
            blocking: AtomicBool::new(false),
            capacity,
        }
    }

    /// Builder-style blocking toggle.
    pub fn with_blocking(self, blocking: bool) -> Self {
        self.set_blocking(blocking);
        self
    }

    fn lock(&self) -> MutexGuard<'_, QueueInner<E>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends an item. Returns it back in `Err` when the capacity is reached.
    pub fn offer(&self, item: E) -> Result<(), E> {
        let mut inner = self.lock();
        if let Some(cap) = self.capacity {
            if inner.items.len() >= cap {
                return Err(item);
            }
        }
        inner.items.push_back(item);
        drop(inner);
        self.available.notify_one();
        Ok(())
    }

    /// Puts an item back at the front, ignoring the capacity.
    pub fn requeue(&self, item: E) {
        self.lock().items.push_front(item);
        self.available.notify_one();
    }

    /// Takes the next item, parking in blocking mode until one exists or a wakeup arrives.
    pub fn poll(&self) -> Option<E> {
        self.poll_until(&|| false)
    }

    /// Like [`poll`](Self::poll), but a blocking poll also gives up as soon as
    /// `interrupted` returns `true`.
    ///
    /// `interrupted` is evaluated under the queue lock, so a flag that is
    /// published before [`wakeup`](Self::wakeup) is never missed.
    pub fn poll_until(&self, interrupted: &dyn Fn() -> bool) -> Option<E> {
        let mut inner = self.lock();
        if let Some(item) = inner.items.pop_front() {
            return Some(item);
        }
        if !self.is_blocking() || interrupted() {
            return None;
        }

        let seen = inner.wakeups;
        let deadline = match inner.poll_timeout {
            Some(t) => Deadline::after(t),
            None => Deadline::forever(),
        };
        loop {
            inner = match deadline.remaining() {
                None => self
                    .available
                    .wait(inner)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(left) => {
                    self.available
                        .wait_timeout(inner, left)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
            if let Some(item) = inner.items.pop_front() {
                return Some(item);
            }
            if inner.wakeups != seen
                || interrupted()
                || !self.is_blocking()
                || deadline.is_expired()
            {
                return None;
            }
        }
    }

    /// Forces every blocked poll to return empty.
    pub fn wakeup(&self) {
        let mut inner = self.lock();
        inner.wakeups = inner.wakeups.wrapping_add(1);
        drop(inner);
        self.available.notify_all();
    }

    /// Toggles blocking mode for subsequent polls; switching it off releases blocked polls.
    pub fn set_blocking(&self, blocking: bool) {
        self.blocking.store(blocking, Ordering::SeqCst);
        if !blocking {
            // Take the lock so a poll between its mode check and its wait is not missed.
            drop(self.lock());
            self.available.notify_all();
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.blocking.load(Ordering::SeqCst)
    }

    /// Bounds a single blocking poll (`None` = until item or wakeup).
    pub fn set_poll_timeout(&self, timeout: Option<Duration>) {
        self.lock().poll_timeout = timeout;
    }

    pub fn poll_timeout(&self) -> Option<Duration> {
        self.lock().poll_timeout
    }

    /// Discards every queued item atomically.
    pub fn clear(&self) {
        self.lock().items.clear();
    }

    /// Removes and returns every queued item, front first.
    pub fn drain(&self) -> Vec<E> {
        self.lock().items.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Configured capacity (`None` = unbounded).
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventQueue<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventQueue")
            .field("len", &self.len())
            .field("blocking", &self.is_blocking())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl<E: Send> Wakeable for EventQueue<E> {
    fn wake(&self) {
        self.wakeup();
    }
}
