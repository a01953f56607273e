//! Transaction state machine states
//!
//! Defines the closed set of states a session's transaction can be in and
//! the predicates the session actor matches on. Transitions themselves live
//! in the actor; invalid (operation, state) pairs are rejected there
//! without a state change.

use serde::{Deserialize, Serialize};

/// Transaction lifecycle states for a logical session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionState {
    /// No transaction has been started on this session
    None,
    /// `start_transaction` was called; no statement has reached the server yet
    Starting,
    /// At least one statement was sent under the open transaction
    InProgress,
    /// The transaction was committed
    Committed,
    /// The transaction was aborted
    Aborted,
}

impl TransactionState {
    /// Check if a new transaction may be started from this state.
    ///
    /// `Committed` and `Aborted` are not terminal: a fresh transaction can
    /// begin from either.
    pub fn can_start_transaction(&self) -> bool {
        matches!(
            self,
            TransactionState::None | TransactionState::Committed | TransactionState::Aborted
        )
    }

    /// Check if ending the transaction requires a server round-trip.
    ///
    /// Only `InProgress` has statements on the server; commit/abort from
    /// `Starting` resolve locally.
    pub fn requires_end_command(&self) -> bool {
        matches!(self, TransactionState::InProgress)
    }

    /// Check if a transaction is currently open
    pub fn is_active(&self) -> bool {
        matches!(self, TransactionState::Starting | TransactionState::InProgress)
    }
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionState::None => write!(f, "None"),
            TransactionState::Starting => write!(f, "Starting"),
            TransactionState::InProgress => write!(f, "InProgress"),
            TransactionState::Committed => write!(f, "Committed"),
            TransactionState::Aborted => write!(f, "Aborted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_allowed_states() {
        assert!(TransactionState::None.can_start_transaction());
        assert!(TransactionState::Committed.can_start_transaction());
        assert!(TransactionState::Aborted.can_start_transaction());
        assert!(!TransactionState::Starting.can_start_transaction());
        assert!(!TransactionState::InProgress.can_start_transaction());
    }

    #[test]
    fn test_end_command_only_in_progress() {
        assert!(TransactionState::InProgress.requires_end_command());
        assert!(!TransactionState::Starting.requires_end_command());
        assert!(!TransactionState::Committed.requires_end_command());
    }

    #[test]
    fn test_active_states() {
        assert!(TransactionState::Starting.is_active());
        assert!(TransactionState::InProgress.is_active());
        assert!(!TransactionState::None.is_active());
        assert!(!TransactionState::Aborted.is_active());
    }
}
