//! # Interrupt gate: lost-wakeup-free interruption of a blocked worker.
//!
//! A controller that pauses or stops a service must be able to wake the worker
//! even if the worker is *about to* park in a blocking poll. [`InterruptGate`]
//! closes that window.
//!
//! ## Protocol
//! ```text
//! controller                               worker
//! ──────────                               ──────
//! gate.lock()          (interrupting=1)    match gate.enter() {
//!   set flags / level / state                None        → skip the blocking call
//!   gate.awake() ─► queue.wake()             Some(entry) → queue.poll_until(flags)
//!              └──► state.wake()                           entry.exit()
//! drop(guard)          (interrupting=0)    }
//! ```
//!
//! ## Rules
//! - Controllers are serialized: a pause racing a stop holds the gate one at a time.
//! - `enter()` never blocks; it refuses entry while a controller is mid-request.
//! - Flags are published before `awake()`, and every [`Wakeable`] re-checks them
//!   under its own lock, so a worker that entered just before the request is
//!   either woken or sees the flags before it parks.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

/// A resource a blocked worker may be parked on.
pub trait Wakeable: Send + Sync {
    /// Makes every thread parked on this resource re-evaluate its condition.
    fn wake(&self);
}

/// Coordinates controllers that interrupt a worker with the worker's blocking sections.
pub struct InterruptGate {
    controller: Mutex<()>,
    interrupting: AtomicBool,
    inside: AtomicBool,
    wakeables: RwLock<Vec<Arc<dyn Wakeable>>>,
}

impl InterruptGate {
    /// Creates a gate with no registered resources.
    pub fn new() -> Self {
        Self {
            controller: Mutex::new(()),
            interrupting: AtomicBool::new(false),
            inside: AtomicBool::new(false),
            wakeables: RwLock::new(Vec::new()),
        }
    }

    /// Registers a resource to be woken by [`awake`](Self::awake).
    pub fn register(&self, wakeable: Arc<dyn Wakeable>) {
        self.wakeables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(wakeable);
    }

    /// Enters the controller-exclusive section. Dropping the guard unlocks it.
    pub fn lock(&self) -> GateGuard<'_> {
        let held = self
            .controller
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.interrupting.store(true, Ordering::SeqCst);
        GateGuard { gate: self, _held: held }
    }

    /// Worker announces a blocking operation.
    ///
    /// Returns `None` when a controller is mid-request; the worker must then
    /// skip the operation.
    pub fn enter(&self) -> Option<GateEntry<'_>> {
        if self.interrupting.load(Ordering::SeqCst) {
            return None;
        }
        self.inside.store(true, Ordering::SeqCst);
        if self.interrupting.load(Ordering::SeqCst) {
            self.inside.store(false, Ordering::SeqCst);
            return None;
        }
        Some(GateEntry { gate: self })
    }

    /// Wakes every registered resource.
    pub fn awake(&self) {
        let wakeables = self
            .wakeables
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        for w in wakeables.iter() {
            w.wake();
        }
    }

    /// Whether a controller currently holds the gate.
    pub fn is_interrupting(&self) -> bool {
        self.interrupting.load(Ordering::SeqCst)
    }

    /// Whether the worker is inside a blocking section.
    pub fn is_inside(&self) -> bool {
        self.inside.load(Ordering::SeqCst)
    }
}

impl Default for InterruptGate {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InterruptGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterruptGate")
            .field("interrupting", &self.is_interrupting())
            .field("inside", &self.is_inside())
            .finish()
    }
}

/// Controller-exclusive section of an [`InterruptGate`].
pub struct GateGuard<'a> {
    gate: &'a InterruptGate,
    _held: MutexGuard<'a, ()>,
}

impl GateGuard<'_> {
    /// Wakes every registered resource while the gate is held.
    pub fn awake(&self) {
        self.gate.awake();
    }

    /// Leaves the controller section.
    pub fn unlock(self) {}
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        self.gate.interrupting.store(false, Ordering::SeqCst);
    }
}

/// Worker-side blocking section; leaving it is [`exit`](Self::exit) or drop.
pub struct GateEntry<'a> {
    gate: &'a InterruptGate,
}

impl GateEntry<'_> {
    /// Leaves the blocking section.
    pub fn exit(self) {}
}

impl Drop for GateEntry<'_> {
    fn drop(&mut self) {
        self.gate.inside.store(false, Ordering::SeqCst);
    }
}
