//! # Interrupt levels for pause and stop requests.
//!
//! [`InterruptLevel`] is chosen by the controller when it asks the service to
//! pause or stop. It governs only the iteration that is currently unwinding
//! toward rest: whether queued events are still dispatched and whether the
//! periodic execute hook still runs before the worker reaches its checkpoint.
//!
//! | Level         | events | execute |
//! |---------------|--------|---------|
//! | `Immediate`   | no     | no      |
//! | `Execute`     | yes    | no      |
//! | `Actions`     | no     | yes     |
//! | `None`        | yes    | yes     |
//!
//! After a resume the active level is reset to [`InterruptLevel::None`].

/// Policy selected when a pause or stop is requested.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InterruptLevel {
    /// Stop dispatching events and skip execute right away (default for `pause()`/`stop()`).
    Immediate = 0,
    /// Keep dispatching events, skip execute.
    Execute = 1,
    /// Skip events, still run execute.
    Actions = 2,
    /// Finish the iteration normally. This is also the level of a running service.
    #[default]
    None = 3,
}

impl InterruptLevel {
    /// Whether events may still be dispatched under this level.
    #[inline]
    pub const fn runs_events(self) -> bool {
        matches!(self, InterruptLevel::Execute | InterruptLevel::None)
    }

    /// Whether the execute hook may still run under this level.
    #[inline]
    pub const fn runs_execute(self) -> bool {
        matches!(self, InterruptLevel::Actions | InterruptLevel::None)
    }

    /// Short stable label for logs.
    pub const fn as_label(self) -> &'static str {
        match self {
            InterruptLevel::Immediate => "immediate",
            InterruptLevel::Execute => "execute",
            InterruptLevel::Actions => "actions",
            InterruptLevel::None => "none",
        }
    }

    #[inline]
    pub(crate) const fn to_u8(self) -> u8 {
        self as u8
    }

    #[inline]
    pub(crate) const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => InterruptLevel::Immediate,
            1 => InterruptLevel::Execute,
            2 => InterruptLevel::Actions,
            _ => InterruptLevel::None,
        }
    }
}

impl std::fmt::Display for InterruptLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}
