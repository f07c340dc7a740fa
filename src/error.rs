//! Error types used by the service engine.
//!
//! [`ServiceError`] covers failures of the engine itself (worker spawn) and of
//! user code running on the worker thread (listener panics).
//!
//! Control operations keep a boolean contract: they report an error through
//! logs, [`Service::last_fault`](crate::Service::last_fault) and the fault bus,
//! then return `false`. The `try_*` variants surface the error directly.

use thiserror::Error;

use crate::listeners::Hook;

/// # Errors produced by the service engine.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The worker thread could not be created (resource exhaustion).
    #[error("failed to spawn worker thread: {reason}")]
    SpawnFailed {
        /// The OS error message.
        reason: String,
    },

    /// A listener hook panicked on the worker thread; the current run was aborted.
    #[error("listener '{listener}' panicked in {hook}: {reason}")]
    ListenerPanicked {
        /// Name reported by [`ServiceListener::name`](crate::ServiceListener::name).
        listener: &'static str,
        /// The hook that panicked.
        hook: Hook,
        /// Panic payload rendered as text.
        reason: String,
    },

    /// A configuration value cannot be honored.
    #[error("invalid config `{field}`: {reason}")]
    InvalidConfig {
        /// Offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl ServiceError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use serviceloop::ServiceError;
    ///
    /// let err = ServiceError::SpawnFailed { reason: "out of memory".into() };
    /// assert_eq!(err.as_label(), "service_spawn_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ServiceError::SpawnFailed { .. } => "service_spawn_failed",
            ServiceError::ListenerPanicked { .. } => "service_listener_panicked",
            ServiceError::InvalidConfig { .. } => "service_invalid_config",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ServiceError::SpawnFailed { reason } => format!("spawn failed: {reason}"),
            ServiceError::ListenerPanicked {
                listener,
                hook,
                reason,
            } => format!("listener={listener} hook={hook} panic: {reason}"),
            ServiceError::InvalidConfig { field, reason } => {
                format!("config field={field}: {reason}")
            }
        }
    }

    /// Indicates whether the engine can simply be started again.
    ///
    /// Every current variant leaves the engine `Stopped` and restartable,
    /// except a configuration that is rejected before construction.
    pub fn is_restartable(&self) -> bool {
        !matches!(self, ServiceError::InvalidConfig { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_stable() {
        let err = ServiceError::ListenerPanicked {
            listener: "audit",
            hook: Hook::Event,
            reason: "boom".into(),
        };
        assert_eq!(err.as_label(), "service_listener_panicked");
        assert_eq!(err.as_message(), "listener=audit hook=on_event panic: boom");
        assert_eq!(
            err.to_string(),
            "listener 'audit' panicked in on_event: boom"
        );
        assert!(err.is_restartable());
    }

    #[test]
    fn test_invalid_config_is_not_restartable() {
        let err = ServiceError::InvalidConfig {
            field: "name",
            reason: "empty".into(),
        };
        assert!(!err.is_restartable());
        assert_eq!(err.as_label(), "service_invalid_config");
    }
}
