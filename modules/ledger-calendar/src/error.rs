//! Typed errors for calendar construction and key parsing.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalendarError {
    /// A reset constant, offset, date string or week key is out of range or malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl CalendarError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        CalendarError::InvalidArgument(msg.into())
    }
}

/// Result type alias for calendar operations.
pub type CalendarResult<T> = std::result::Result<T, CalendarError>;
