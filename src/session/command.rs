//! Session command decoration and transaction commands
//!
//! Pure functions that stamp outgoing command documents with session
//! metadata and build the commitTransaction/abortTransaction documents.
//! Command documents are insertion-ordered: the verb stays first, session
//! fields are appended after the caller's own keys.

use super::options::SessionOptions;
use super::server_session::ServerSession;
use super::state::TransactionState;
use crate::wire::SESSIONS_MIN_WIRE_VERSION;
use bson::{doc, Bson, Document, Timestamp};

/// Decorate an outgoing command with session metadata.
///
/// Behavior is gated on the wire version and the transaction state:
///
/// * pre-session servers (`wire_version < 6`) get the command untouched;
/// * outside a transaction, the command carries `lsid` and the
///   causal-consistency read concern;
/// * the first statement of a transaction additionally carries `txnNumber`,
///   `startTransaction: true`, and `autocommit: false`, and sheds any
///   caller-supplied `writeConcern` (write concern belongs on commit/abort);
/// * later statements carry `lsid`, `txnNumber`, and `autocommit: false`
///   and shed both `readConcern` and `writeConcern` (only valid on the
///   first statement).
pub(crate) fn decorate_command(
    command: Document,
    state: TransactionState,
    server_session: &ServerSession,
    wire_version: u32,
    causal_consistency: bool,
    operation_time: Option<Timestamp>,
) -> Document {
    if wire_version < SESSIONS_MIN_WIRE_VERSION {
        return command;
    }

    let mut command = command;
    command.insert("lsid", server_session.session_id_doc());

    match state {
        TransactionState::None | TransactionState::Committed | TransactionState::Aborted => {
            merge_read_concern(&mut command, causal_consistency, operation_time);
        }
        TransactionState::Starting => {
            command.insert("txnNumber", Bson::Int64(server_session.txn_num()));
            command.insert("startTransaction", Bson::Boolean(true));
            command.insert("autocommit", Bson::Boolean(false));
            merge_read_concern(&mut command, causal_consistency, operation_time);
            command.remove("writeConcern");
        }
        TransactionState::InProgress => {
            command.insert("txnNumber", Bson::Int64(server_session.txn_num()));
            command.insert("autocommit", Bson::Boolean(false));
            command.remove("readConcern");
            command.remove("writeConcern");
        }
    }

    strip_null_values(&mut command);
    command
}

/// Merge the causal-consistency augmentation into the caller's read concern.
///
/// With causal consistency off or no operation time observed yet, the
/// caller's read concern passes through untouched. Otherwise
/// `afterClusterTime` is set on it, preserving its other fields. An empty
/// result drops the key entirely.
fn merge_read_concern(
    command: &mut Document,
    causal_consistency: bool,
    operation_time: Option<Timestamp>,
) {
    let mut read_concern = command
        .get_document("readConcern")
        .map(Document::clone)
        .unwrap_or_default();

    if causal_consistency {
        if let Some(timestamp) = operation_time {
            read_concern.insert("afterClusterTime", Bson::Timestamp(timestamp));
        }
    }

    if read_concern.is_empty() {
        command.remove("readConcern");
    } else {
        command.insert("readConcern", read_concern);
    }
}

/// Drop top-level keys holding a null placeholder so the wire driver never
/// sees absent values.
fn strip_null_values(command: &mut Document) {
    let null_keys: Vec<String> = command
        .iter()
        .filter(|(_, value)| matches!(value, Bson::Null))
        .map(|(key, _)| key.clone())
        .collect();
    for key in null_keys {
        command.remove(&key);
    }
}

/// Build the commitTransaction command for the current transaction.
pub(crate) fn commit_command(
    server_session: &ServerSession,
    options: &SessionOptions,
) -> Document {
    let mut command = doc! {
        "commitTransaction": 1,
        "lsid": server_session.session_id_doc(),
        "txnNumber": Bson::Int64(server_session.txn_num()),
        "autocommit": false,
    };
    if let Some(write_concern) = options.write_concern_doc() {
        command.insert("writeConcern", write_concern);
    }
    if let Some(max_time_ms) = options.max_commit_time_ms {
        command.insert("maxTimeMS", Bson::Int64(max_time_ms));
    }
    command
}

/// Build the abortTransaction command for the current transaction.
pub(crate) fn abort_command(server_session: &ServerSession, options: &SessionOptions) -> Document {
    let mut command = doc! {
        "abortTransaction": 1,
        "lsid": server_session.session_id_doc(),
        "txnNumber": Bson::Int64(server_session.txn_num()),
        "autocommit": false,
    };
    if let Some(write_concern) = options.write_concern_doc() {
        command.insert("writeConcern", write_concern);
    }
    command
}
