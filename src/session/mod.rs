//! Logical sessions and multi-statement transactions
//!
//! This module is the client-side session core: it owns the server-assigned
//! session identifier, sequences transaction numbers, enforces the legal
//! transaction lifecycle, stamps outgoing commands with session metadata,
//! and tracks the operation time for causally consistent reads.
//!
//! - Session actor - one mailbox-serialized task per session
//! - `start_transaction` / `commit_transaction` / `abort_transaction`
//! - `bind_command` - wire-version-gated command decoration
//! - Operation-time tracking for `readConcern.afterClusterTime`
//! - Manager helpers - checkout/checkin discipline and `with_transaction`
//!
//! Commit and abort are dispatched against the `admin` database on the
//! session's bound connection; the state machine transitions whether or not
//! the server round-trip succeeds, and never retries either command.

mod actor;
mod command;
pub mod manager;
mod options;
mod server_session;
mod state;

pub use actor::Session;
pub use manager::{
    end_implicit_session, end_session, start_implicit_session, start_session, with_transaction,
    MAX_CHECKOUT_RETRIES,
};
pub use options::{SessionOptions, WriteAcknowledgment, WriteConcern};
pub use server_session::ServerSession;
pub use state::TransactionState;
