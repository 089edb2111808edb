//! Queue error types.

use thiserror::Error;

use super::models::{PersonId, TableId};
use crate::db::timeouts::TimeoutError;

/// Queue and seating errors
#[derive(Debug, Error)]
pub enum QueueError {
    /// Table type configuration violates the estimator's contract
    #[error("Invalid configuration for {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    /// Timestamp not in `YYYY-MM-DD HH:MM:SS` form
    #[error("Invalid timestamp '{value}': {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// Rejected request input
    #[error("{0}")]
    InvalidInput(String),

    /// Table type not found
    #[error("Table type not found: {0}")]
    TableTypeNotFound(String),

    /// Person not found
    #[error("Person not found: {0}")]
    PersonNotFound(PersonId),

    /// Table not found
    #[error("Table not found: {0}")]
    TableNotFound(TableId),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Database operation exceeded its deadline
    #[error("Database operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl From<TimeoutError> for QueueError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(after) => QueueError::Timeout(after),
            TimeoutError::Database(e) => QueueError::Database(e),
        }
    }
}

impl QueueError {
    /// Shorthand for [`QueueError::InvalidConfig`].
    pub fn invalid_config(field: &str, reason: impl Into<String>) -> Self {
        QueueError::InvalidConfig {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Database errors are sanitized so SQL details never reach the caller.
    pub fn client_message(&self) -> String {
        match self {
            QueueError::Database(_) | QueueError::Timeout(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Whether the error was caused by the request rather than the system
    pub fn is_client_error(&self) -> bool {
        !matches!(self, QueueError::Database(_) | QueueError::Timeout(_))
    }
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;
