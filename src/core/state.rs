//! # Lifecycle state register.
//!
//! [`StateRegister`] holds the authoritative [`LifecycleState`] of a service.
//! Exactly one state holds at any instant; queries test membership in a
//! [`StateSet`] of interesting values.
//!
//! ## Architecture
//! ```text
//!            ┌──────────────── Mutex<LifecycleState> ────────────────┐
//! control ──►│ lock() ─► StateGuard ─► has / set / wait_until (loop) │
//!            └───────────────┬──────────────────────────┬────────────┘
//!                            │ set() mirrors            │ notify_all
//!                            ▼                          ▼
//!                     AtomicU8 mirror            Condvar (waiters)
//!                  (lock-free has/get)
//! ```
//!
//! ## Rules
//! - All mutations go through the mutex, so check-then-set sequences made on a
//!   single [`StateGuard`] are atomic with respect to other controllers.
//! - Waiting releases the mutex while parked and re-evaluates after every
//!   wakeup (spurious wakeups are tolerated).
//! - `wakeup()` makes every waiter re-evaluate immediately.

use std::fmt;
use std::ops::BitOr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::gate::Wakeable;
use super::wait::Deadline;

/// Lifecycle state of a service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LifecycleState {
    /// No worker thread; the initial state.
    Stopped = 0b0_0001,
    /// Worker is servicing events and executes.
    Running = 0b0_0010,
    /// A pause was requested; the worker has not reached its checkpoint yet.
    Pausing = 0b0_0100,
    /// Worker is parked at its checkpoint.
    Paused = 0b0_1000,
    /// A stop was requested; the worker has not left its loop yet.
    Stopping = 0b1_0000,
}

impl LifecycleState {
    const ALL: [LifecycleState; 5] = [
        LifecycleState::Stopped,
        LifecycleState::Running,
        LifecycleState::Pausing,
        LifecycleState::Paused,
        LifecycleState::Stopping,
    ];

    /// Bit used for this state inside a [`StateSet`].
    #[inline]
    pub const fn bit(self) -> u8 {
        self as u8
    }

    /// Short stable label for logs.
    pub const fn as_label(self) -> &'static str {
        match self {
            LifecycleState::Stopped => "stopped",
            LifecycleState::Running => "running",
            LifecycleState::Pausing => "pausing",
            LifecycleState::Paused => "paused",
            LifecycleState::Stopping => "stopping",
        }
    }

    fn from_bit(bit: u8) -> Self {
        Self::ALL
            .into_iter()
            .find(|s| s.bit() == bit)
            .unwrap_or(LifecycleState::Stopped)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Set of interesting lifecycle states used by membership tests and waits.
///
/// ```
/// use serviceloop::{LifecycleState, StateSet};
///
/// let resting = LifecycleState::Paused | LifecycleState::Stopped;
/// assert_eq!(resting, StateSet::RESTING);
/// assert!(resting.contains(LifecycleState::Paused));
/// assert!(!resting.contains(LifecycleState::Running));
/// ```
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StateSet(u8);

impl StateSet {
    /// No state at all; a wait on it only ends by timeout.
    pub const EMPTY: StateSet = StateSet(0);
    /// `Paused | Stopped`: no worker activity in progress.
    pub const RESTING: StateSet =
        StateSet(LifecycleState::Paused.bit() | LifecycleState::Stopped.bit());
    /// `Running | Paused | Pausing`: a worker exists and was not asked to stop.
    pub const STARTED: StateSet = StateSet(
        LifecycleState::Running.bit()
            | LifecycleState::Paused.bit()
            | LifecycleState::Pausing.bit(),
    );
    /// `Running | Stopping | Stopped`: outcomes accepted by a resume.
    pub const RESUMED: StateSet = StateSet(
        LifecycleState::Running.bit()
            | LifecycleState::Stopping.bit()
            | LifecycleState::Stopped.bit(),
    );
    /// Every state.
    pub const ALL: StateSet = StateSet(0b1_1111);

    /// Set containing only `state`.
    #[inline]
    pub const fn of(state: LifecycleState) -> Self {
        StateSet(state.bit())
    }

    /// Returns this set with `state` added.
    #[inline]
    pub const fn with(self, state: LifecycleState) -> Self {
        StateSet(self.0 | state.bit())
    }

    /// Union of two sets.
    #[inline]
    pub const fn union(self, other: StateSet) -> Self {
        StateSet(self.0 | other.0)
    }

    /// Whether `state` is a member.
    #[inline]
    pub const fn contains(self, state: LifecycleState) -> bool {
        self.0 & state.bit() != 0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates over the members in declaration order.
    pub fn iter(self) -> impl Iterator<Item = LifecycleState> {
        LifecycleState::ALL
            .into_iter()
            .filter(move |s| self.contains(*s))
    }
}

impl fmt::Debug for StateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl From<LifecycleState> for StateSet {
    fn from(state: LifecycleState) -> Self {
        StateSet::of(state)
    }
}

impl BitOr for LifecycleState {
    type Output = StateSet;

    fn bitor(self, rhs: LifecycleState) -> StateSet {
        StateSet::of(self).with(rhs)
    }
}

impl BitOr<LifecycleState> for StateSet {
    type Output = StateSet;

    fn bitor(self, rhs: LifecycleState) -> StateSet {
        self.with(rhs)
    }
}

impl BitOr for StateSet {
    type Output = StateSet;

    fn bitor(self, rhs: StateSet) -> StateSet {
        self.union(rhs)
    }
}

/// Holds the current lifecycle state and lets threads wait for sets of states.
pub struct StateRegister {
    current: Mutex<LifecycleState>,
    mirror: AtomicU8,
    changed: Condvar,
}

impl StateRegister {
    /// Creates a register holding `initial`.
    pub fn new(initial: LifecycleState) -> Self {
        Self {
            current: Mutex::new(initial),
            mirror: AtomicU8::new(initial.bit()),
            changed: Condvar::new(),
        }
    }

    /// Acquires the register's lock for a multi-step transition.
    pub fn lock(&self) -> StateGuard<'_> {
        StateGuard {
            register: self,
            current: self
                .current
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Current state, read without taking the lock.
    #[inline]
    pub fn get(&self) -> LifecycleState {
        LifecycleState::from_bit(self.mirror.load(Ordering::SeqCst))
    }

    /// Whether the current state is a member of `mask` (non-blocking).
    #[inline]
    pub fn has(&self, mask: impl Into<StateSet>) -> bool {
        mask.into().contains(self.get())
    }

    /// Whether the current state is exactly `state` (non-blocking).
    #[inline]
    pub fn equals(&self, state: LifecycleState) -> bool {
        self.get() == state
    }

    /// Replaces the current state and wakes every waiter.
    pub fn set(&self, state: LifecycleState) {
        self.lock().set(state);
    }

    /// Blocks until the state is a member of `mask` or `timeout` elapses
    /// (`None` = forever). Returns whether the mask was met.
    pub fn wait_for(&self, mask: impl Into<StateSet>, timeout: Option<Duration>) -> bool {
        let deadline = match timeout {
            Some(t) => Deadline::after(t),
            None => Deadline::forever(),
        };
        self.lock().wait_until(mask.into(), deadline).1
    }

    /// Forces every waiter to re-evaluate its condition.
    ///
    /// Does not take the lock, so a controller holding a [`StateGuard`] may call it.
    pub fn wakeup(&self) {
        self.changed.notify_all();
    }
}

impl Default for StateRegister {
    fn default() -> Self {
        Self::new(LifecycleState::Stopped)
    }
}

impl fmt::Debug for StateRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateRegister")
            .field("current", &self.get())
            .finish()
    }
}

impl Wakeable for StateRegister {
    fn wake(&self) {
        self.wakeup();
    }
}

/// Exclusive access to a [`StateRegister`] for the duration of a transition.
pub struct StateGuard<'a> {
    register: &'a StateRegister,
    current: MutexGuard<'a, LifecycleState>,
}

impl<'a> StateGuard<'a> {
    #[inline]
    pub fn get(&self) -> LifecycleState {
        *self.current
    }

    #[inline]
    pub fn has(&self, mask: impl Into<StateSet>) -> bool {
        mask.into().contains(*self.current)
    }

    #[inline]
    pub fn equals(&self, state: LifecycleState) -> bool {
        *self.current == state
    }

    /// Replaces the current state and broadcasts to all waiters.
    pub fn set(&mut self, state: LifecycleState) {
        *self.current = state;
        self.register.mirror.store(state.bit(), Ordering::SeqCst);
        self.register.changed.notify_all();
    }

    /// Blocks (releasing the lock while parked) until the state is in `mask`
    /// or the deadline passes. Returns the re-acquired guard and whether the
    /// mask was met.
    pub(crate) fn wait_until(self, mask: StateSet, deadline: Deadline) -> (Self, bool) {
        let StateGuard {
            register,
            mut current,
        } = self;
        loop {
            if mask.contains(*current) {
                return (StateGuard { register, current }, true);
            }
            match deadline.remaining() {
                None => {
                    current = register
                        .changed
                        .wait(current)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                Some(left) if left.is_zero() => {
                    return (StateGuard { register, current }, false);
                }
                Some(left) => {
                    current = register
                        .changed
                        .wait_timeout(current, left)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }
            }
        }
    }
}
