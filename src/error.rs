//! Error types for Mongoline
//!
//! This module defines the crate-wide error enum and the `Result` alias used
//! throughout the session core. Errors split into protocol misuse (the
//! caller asked for a transition the state machine forbids; state is left
//! unchanged) and wire errors (the server round-trip for commit/abort
//! failed; the state has already advanced).

use thiserror::Error;

/// Result type alias for Mongoline operations
pub type Result<T> = std::result::Result<T, MongolineError>;

/// Main error type for session and transaction operations
#[derive(Error, Debug)]
pub enum MongolineError {
    /// Commit or abort was requested while no transaction is open.
    /// The session state is unchanged.
    #[error("no transaction started")]
    NoTransactionStarted,

    /// `start_transaction` was called while a transaction is already open
    #[error("transaction already in progress")]
    TransactionInProgress,

    /// The wire driver reported a failure while dispatching a command.
    /// For commit/abort the state has already transitioned when this
    /// surfaces; the session never retries the command.
    #[error("wire error: {0}")]
    Wire(String),

    /// Session checkout from the topology failed
    #[error("session checkout failed: {0}")]
    SessionCheckout(String),

    /// The session actor has stopped; the handle is stale
    #[error("session closed")]
    SessionClosed,

    /// The user function passed to `with_transaction` returned an error
    /// or panicked
    #[error("transaction function failed: {0}")]
    TransactionFn(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl MongolineError {
    /// Build a wire error from any displayable driver failure
    pub fn wire(msg: impl Into<String>) -> Self {
        MongolineError::Wire(msg.into())
    }

    /// True for errors that report an illegal (operation, state) pair
    pub fn is_protocol_misuse(&self) -> bool {
        matches!(
            self,
            MongolineError::NoTransactionStarted | MongolineError::TransactionInProgress
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_misuse_classification() {
        assert!(MongolineError::NoTransactionStarted.is_protocol_misuse());
        assert!(MongolineError::TransactionInProgress.is_protocol_misuse());
        assert!(!MongolineError::Wire("boom".to_string()).is_protocol_misuse());
        assert!(!MongolineError::SessionClosed.is_protocol_misuse());
    }

    #[test]
    fn test_error_display() {
        let err = MongolineError::wire("connection reset");
        assert_eq!(err.to_string(), "wire error: connection reset");
        assert_eq!(
            MongolineError::NoTransactionStarted.to_string(),
            "no transaction started"
        );
    }
}
