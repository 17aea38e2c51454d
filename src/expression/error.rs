//! Error types for restriction evaluation and analysis.

use thiserror::Error;

/// Log target for diagnostics emitted by the expression core
pub const LOG_TARGET: &str = "cql_expression";

/// Errors that can occur while evaluating or analyzing a restriction
#[derive(Error, Debug)]
pub enum ExpressionError {
    /// The query is malformed; reported back to the client
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The query uses a combination this core does not handle
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A structural invariant of the expression tree was violated
    #[error("Internal error: {0}")]
    Internal(String),

    /// A serialized value could not be decoded
    #[error("Marshaling error: {0}")]
    Marshal(#[from] anyhow::Error),
}

impl ExpressionError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        ExpressionError::InvalidRequest(message.into())
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        ExpressionError::UnsupportedOperation(message.into())
    }

    /// True for programmer errors, false for errors caused by the query
    pub fn is_internal(&self) -> bool {
        matches!(self, ExpressionError::Internal(_))
    }
}

/// Report a broken tree invariant and build the matching error
pub fn on_internal_error(message: impl Into<String>) -> ExpressionError {
    let message = message.into();
    log::error!(target: LOG_TARGET, "{}", message);
    ExpressionError::Internal(message)
}

/// Result type for expression operations
pub type ExpressionResult<T> = Result<T, ExpressionError>;
