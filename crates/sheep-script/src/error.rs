use thiserror::Error;

/// Errors from instrumentation and trace decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A line tagged with the session prefix has an unrecognized shape.
    #[error("protocol error: {reason}: {line:?}")]
    Protocol {
        /// The offending output line.
        line: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A session identifier that cannot be embedded in marker lines.
    #[error("invalid session id: {0:?}")]
    InvalidSession(String),
}

impl Error {
    pub(crate) fn protocol(line: &str, reason: impl Into<String>) -> Self {
        Error::Protocol {
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for sheep-script operations.
pub type Result<T> = std::result::Result<T, Error>;
