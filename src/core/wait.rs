//! # Wait selection and deadlines.
//!
//! Every blocking call in the crate takes a [`Wait`]: return right away, wait
//! without bound, or wait up to a timeout. Expiry never cancels a request that
//! was already issued; it only reports the status observed at that moment.
//!
//! A control operation computes one [`Deadline`] on entry and shares it between
//! its pre-wait (e.g. `Stopping → Stopped` before a start) and its final wait.

use std::time::{Duration, Instant};

/// How long a control operation or state wait may block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Wait {
    /// Do not block; pre-waits are skipped as well.
    No,
    /// Block until the outcome is reached.
    #[default]
    Forever,
    /// Block at most the given duration.
    Timeout(Duration),
}

impl Wait {
    /// Converts an optional timeout (`None` = forever) into a [`Wait`].
    pub fn from_timeout(timeout: Option<Duration>) -> Self {
        match timeout {
            Some(t) => Wait::Timeout(t),
            None => Wait::Forever,
        }
    }

    /// Returns the deadline for this wait, or `None` for [`Wait::No`].
    pub(crate) fn deadline(self) -> Option<Deadline> {
        match self {
            Wait::No => None,
            Wait::Forever => Some(Deadline::forever()),
            Wait::Timeout(t) => Some(Deadline::after(t)),
        }
    }
}

impl From<Duration> for Wait {
    fn from(timeout: Duration) -> Self {
        Wait::Timeout(timeout)
    }
}

impl From<bool> for Wait {
    /// `true` → [`Wait::Forever`], `false` → [`Wait::No`].
    fn from(wait: bool) -> Self {
        if wait {
            Wait::Forever
        } else {
            Wait::No
        }
    }
}

/// Point in time after which a wait gives up (`None` = never).
#[derive(Clone, Copy, Debug)]
pub(crate) struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    pub(crate) fn forever() -> Self {
        Self { at: None }
    }

    /// A timeout too large to represent as an `Instant` is treated as forever.
    pub(crate) fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now().checked_add(timeout),
        }
    }

    /// Time left: `None` when unbounded, `Some(ZERO)` once expired.
    pub(crate) fn remaining(&self) -> Option<Duration> {
        self.at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    pub(crate) fn is_expired(&self) -> bool {
        matches!(self.remaining(), Some(left) if left.is_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_conversions() {
        assert_eq!(Wait::from(true), Wait::Forever);
        assert_eq!(Wait::from(false), Wait::No);
        assert_eq!(Wait::from_timeout(None), Wait::Forever);
        assert_eq!(
            Wait::from(Duration::from_millis(5)),
            Wait::Timeout(Duration::from_millis(5))
        );
        assert!(Wait::No.deadline().is_none());
    }

    #[test]
    fn test_deadline_expiry() {
        let forever = Deadline::forever();
        assert_eq!(forever.remaining(), None);
        assert!(!forever.is_expired());

        let now = Deadline::after(Duration::ZERO);
        assert!(now.is_expired());

        let huge = Deadline::after(Duration::MAX);
        assert!(!huge.is_expired());
    }
}
