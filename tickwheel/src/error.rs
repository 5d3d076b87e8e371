//! Error types.

use std::fmt;

/// Errors surfaced by wheel construction and scheduling.
///
/// Cancelling an unknown key is not an error: [`Wheel::cancel`] reports it as
/// `false`, since the caller may simply have lost a race with the tick that
/// fired the task.
///
/// [`Wheel::cancel`]: crate::Wheel::cancel
#[derive(Debug, thiserror::Error)]
pub enum WheelError {
    /// A configuration value is out of range.
    ///
    /// Only [`WheelConfig::validate`](crate::WheelConfig::validate) returns
    /// this. Constructors substitute the documented default instead.
    #[error("invalid configuration ({field}): {reason}")]
    InvalidConfiguration {
        field: &'static str,
        reason: &'static str,
    },

    /// `schedule` was called with a key that is still live on the wheel.
    ///
    /// The live entry is left untouched.
    #[error("task key `{0}` is already scheduled")]
    DuplicateKey(String),

    /// The wheel has been stopped and accepts no new work.
    #[error("wheel is stopped")]
    Stopped,

    /// A ticker or worker thread could not be spawned.
    #[error("failed to spawn {thread} thread: {source}")]
    Spawn {
        thread: String,
        #[source]
        source: std::io::Error,
    },
}

/// A callback that panicked while being dispatched.
///
/// Handed to the failure hook configured with
/// [`WheelConfig::with_failure_hook`](crate::WheelConfig::with_failure_hook).
/// Never propagated to the tick loop or to the caller that scheduled the task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackFailure {
    /// Key the task was scheduled under.
    pub key: String,
    /// Panic payload rendered as text, when it was a string.
    pub message: String,
}

impl fmt::Display for CallbackFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "callback for `{}` panicked: {}", self.key, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_key_names_the_key() {
        let err = WheelError::DuplicateKey("session-42".into());
        assert_eq!(err.to_string(), "task key `session-42` is already scheduled");
    }

    #[test]
    fn spawn_error_keeps_io_source() {
        let err = WheelError::Spawn {
            thread: "tickwheel-ticker".into(),
            source: std::io::Error::other("out of threads"),
        };
        assert_eq!(
            err.to_string(),
            "failed to spawn tickwheel-ticker thread: out of threads"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn callback_failure_display() {
        let failure = CallbackFailure {
            key: "task1".into(),
            message: "boom".into(),
        };
        assert_eq!(failure.to_string(), "callback for `task1` panicked: boom");
    }
}
