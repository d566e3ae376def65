/// Result alias that carries the custom [`EngineError`] type.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Common error type for the core crate.
///
/// Stray lane presses and the end of a run are not errors: the former is
/// reported as [`crate::Outcome::NoMatch`], the latter as a status change on
/// [`crate::RunState`].
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The level theme failed validation and the run must not start.
    #[error("invalid theme field `{field}`: {reason}")]
    InvalidTheme {
        field: &'static str,
        reason: String,
    },
    /// The engine timing configuration failed validation.
    #[error("invalid engine configuration `{field}`: {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: String,
    },
    /// The clock source could not provide a timestamp at start.
    #[error("clock source is unavailable")]
    ClockUnavailable,
    /// The audio render sink is unreachable at start.
    #[error("audio sink is unavailable")]
    AudioUnavailable,
    /// `start` was called while a run is still in progress.
    #[error("a run is already in progress")]
    AlreadyRunning,
    /// The previous run ended and the engine has not been reset yet.
    #[error("the run has ended; reset before starting again")]
    RunEnded,
    /// A thread panicked while holding the engine state lock.
    #[error("{0} has been poisoned")]
    Poisoned(&'static str),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Wrapper around JSON decoding errors.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    pub(crate) fn theme<T: Into<String>>(field: &'static str, reason: T) -> Self {
        Self::InvalidTheme {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn config<T: Into<String>>(field: &'static str, reason: T) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}
