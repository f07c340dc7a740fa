//! Worker-visible status: request flags, interrupt level, budgets and toggles.
//!
//! These are read on the worker's hot path, so each value is a plain atomic
//! checked on its own; none of them is part of a joint invariant. The paused
//! and stopped requests share one status word, so "anything requested?" is a
//! single load. The heavier state lock is only taken once a bit is set.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU8, Ordering};

use crate::config::ServiceConfig;
use crate::policies::InterruptLevel;

const PAUSE_REQUESTED: u8 = 0b01;
const STOP_REQUESTED: u8 = 0b10;

/// Status word plus the active interrupt level.
pub(crate) struct Status {
    word: AtomicU8,
    level: AtomicU8,
}

impl Status {
    pub(crate) fn new() -> Self {
        Self {
            word: AtomicU8::new(0),
            level: AtomicU8::new(InterruptLevel::None.to_u8()),
        }
    }

    #[inline]
    pub(crate) fn pause_requested(&self) -> bool {
        self.word.load(Ordering::SeqCst) & PAUSE_REQUESTED != 0
    }

    #[inline]
    pub(crate) fn stop_requested(&self) -> bool {
        self.word.load(Ordering::SeqCst) & STOP_REQUESTED != 0
    }

    /// Fast-path check: is any pause or stop pending?
    #[inline]
    pub(crate) fn interrupt_requested(&self) -> bool {
        self.word.load(Ordering::SeqCst) != 0
    }

    #[inline]
    pub(crate) fn level(&self) -> InterruptLevel {
        InterruptLevel::from_u8(self.level.load(Ordering::SeqCst))
    }

    /// The level is published before the flag so a worker seeing the flag sees the level.
    pub(crate) fn request_pause(&self, level: InterruptLevel) {
        self.level.store(level.to_u8(), Ordering::SeqCst);
        self.word.fetch_or(PAUSE_REQUESTED, Ordering::SeqCst);
    }

    pub(crate) fn request_stop(&self, level: InterruptLevel) {
        self.level.store(level.to_u8(), Ordering::SeqCst);
        self.word.fetch_or(STOP_REQUESTED, Ordering::SeqCst);
    }

    /// Clears a pause and resets the level to `None`.
    pub(crate) fn clear_pause(&self) {
        self.word.fetch_and(!PAUSE_REQUESTED, Ordering::SeqCst);
        self.level
            .store(InterruptLevel::None.to_u8(), Ordering::SeqCst);
    }

    /// Fresh status for a new run.
    pub(crate) fn reset(&self) {
        self.word.store(0, Ordering::SeqCst);
        self.level
            .store(InterruptLevel::None.to_u8(), Ordering::SeqCst);
    }
}

/// Outcome of taking one unit from a [`Budget`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Consume {
    /// No limit configured.
    Unlimited,
    /// One unit taken; `last` when that was the final unit.
    Granted { last: bool },
    /// Nothing left.
    Exhausted,
}

/// Countdown for events, executes or iterations.
///
/// ## Sentinel values
/// - `UNLIMITED` (`-1`) → no limit
/// - `0` → exhausted
pub(crate) struct Budget(AtomicI64);

impl Budget {
    pub(crate) const UNLIMITED: i64 = -1;

    pub(crate) fn new(limit: Option<u64>) -> Self {
        Self(AtomicI64::new(Self::encode(limit)))
    }

    fn encode(limit: Option<u64>) -> i64 {
        match limit {
            Some(n) => i64::try_from(n).unwrap_or(i64::MAX),
            None => Self::UNLIMITED,
        }
    }

    pub(crate) fn set(&self, limit: Option<u64>) {
        self.0.store(Self::encode(limit), Ordering::SeqCst);
    }

    pub(crate) fn get(&self) -> Option<u64> {
        u64::try_from(self.0.load(Ordering::SeqCst)).ok()
    }

    #[inline]
    pub(crate) fn is_exhausted(&self) -> bool {
        self.0.load(Ordering::SeqCst) == 0
    }

    /// Takes one unit; controllers may overwrite the value concurrently.
    pub(crate) fn consume(&self) -> Consume {
        match self
            .0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n > 0).then(|| n - 1)
            }) {
            Ok(1) => Consume::Granted { last: true },
            Ok(_) => Consume::Granted { last: false },
            Err(0) => Consume::Exhausted,
            Err(_) => Consume::Unlimited,
        }
    }
}

/// The three auto-stop budgets.
pub(crate) struct Budgets {
    pub(crate) events: Budget,
    pub(crate) executes: Budget,
    pub(crate) iterations: Budget,
}

impl Budgets {
    pub(crate) fn from_config(cfg: &ServiceConfig) -> Self {
        Self {
            events: Budget::new(cfg.remaining_events),
            executes: Budget::new(cfg.remaining_executes),
            iterations: Budget::new(cfg.remaining_iterations),
        }
    }
}

/// Independently toggled admission/processing switches.
pub(crate) struct Flags {
    pub(crate) accepts_events: AtomicBool,
    pub(crate) events_active: AtomicBool,
    pub(crate) execute_active: AtomicBool,
}

impl Flags {
    pub(crate) fn from_config(cfg: &ServiceConfig) -> Self {
        Self {
            accepts_events: AtomicBool::new(cfg.accepts_events),
            events_active: AtomicBool::new(cfg.events_active),
            execute_active: AtomicBool::new(cfg.execute_active),
        }
    }

    #[inline]
    pub(crate) fn load(flag: &AtomicBool) -> bool {
        flag.load(Ordering::SeqCst)
    }

    #[inline]
    pub(crate) fn store(flag: &AtomicBool, value: bool) {
        flag.store(value, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_counts_down_to_exhaustion() {
        let budget = Budget::new(Some(2));
        assert_eq!(budget.consume(), Consume::Granted { last: false });
        assert_eq!(budget.get(), Some(1));
        assert_eq!(budget.consume(), Consume::Granted { last: true });
        assert!(budget.is_exhausted());
        assert_eq!(budget.consume(), Consume::Exhausted);
        assert_eq!(budget.get(), Some(0));
    }

    #[test]
    fn test_unlimited_budget_never_runs_out() {
        let budget = Budget::new(None);
        for _ in 0..1_000 {
            assert_eq!(budget.consume(), Consume::Unlimited);
        }
        assert_eq!(budget.get(), None);
        budget.set(Some(0));
        assert_eq!(budget.consume(), Consume::Exhausted);
        budget.set(Some(u64::MAX));
        assert_eq!(budget.get(), Some(i64::MAX as u64));
    }

    #[test]
    fn test_status_word_and_level() {
        let status = Status::new();
        assert!(!status.interrupt_requested());
        assert_eq!(status.level(), InterruptLevel::None);

        status.request_pause(InterruptLevel::Execute);
        assert!(status.pause_requested());
        assert!(!status.stop_requested());
        assert_eq!(status.level(), InterruptLevel::Execute);

        status.clear_pause();
        assert!(!status.interrupt_requested());
        assert_eq!(status.level(), InterruptLevel::None);

        status.request_stop(InterruptLevel::Immediate);
        assert!(status.stop_requested());
        status.reset();
        assert!(!status.interrupt_requested());
    }
}
