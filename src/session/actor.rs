//! Session actor
//!
//! Each logical session is a single tokio task owning a [`ServerSession`],
//! a bound connection, and the transaction state machine. Callers on any
//! task talk to it through a cloneable [`Session`] handle; the mailbox is
//! the only synchronization primitive, so requests are served strictly one
//! at a time. Commit and abort hold the mailbox across their server
//! round-trip: the state machine accepts no other command while a
//! transaction is being ended.
//!
//! If every handle is dropped while a transaction is in progress, the actor
//! aborts the transaction as its last act and, when it was spawned with a
//! pool reference, checks the server session back in so nothing leaks.

use super::command::{abort_command, commit_command, decorate_command};
use super::options::SessionOptions;
use super::server_session::ServerSession;
use super::state::TransactionState;
use crate::error::{MongolineError, Result};
use crate::topology::{SessionKind, SessionPool};
use crate::wire::{ConnectionHandle, WireDriver, ADMIN_DATABASE};
use bson::{Document, Timestamp};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Requests served by the session actor
enum SessionRequest {
    StartTransaction {
        response: oneshot::Sender<Result<()>>,
    },
    BindCommand {
        command: Document,
        response: oneshot::Sender<(ConnectionHandle, Document)>,
    },
    CommitTransaction {
        response: oneshot::Sender<Result<()>>,
    },
    AbortTransaction {
        response: oneshot::Sender<Result<()>>,
    },
    Connection {
        response: oneshot::Sender<ConnectionHandle>,
    },
    ServerSessionInfo {
        response: oneshot::Sender<(ServerSession, bool)>,
    },
    TransactionState {
        response: oneshot::Sender<TransactionState>,
    },
    /// Fire-and-forget; callers do not wait
    AdvanceOperationTime { timestamp: Timestamp },
    EndSession {
        response: oneshot::Sender<ServerSession>,
    },
    /// Replies `None` on explicit sessions and leaves them running
    EndImplicitSession {
        response: oneshot::Sender<Option<ServerSession>>,
    },
}

/// Handle to a running session actor.
///
/// Cheap to clone; all clones address the same mailbox and observe a single
/// serialized request order.
#[derive(Debug, Clone)]
pub struct Session {
    requests: mpsc::UnboundedSender<SessionRequest>,
}

impl Session {
    /// Spawn a session actor and return its handle.
    ///
    /// `pool` is optional: when present, the actor checks the server
    /// session back in if it shuts down because every handle was dropped.
    /// Sessions ended through `end_session`/`end_implicit_session` hand the
    /// server session back to the caller instead.
    pub fn start(
        conn: ConnectionHandle,
        driver: Arc<dyn WireDriver>,
        server_session: ServerSession,
        wire_version: u32,
        kind: SessionKind,
        options: SessionOptions,
        pool: Option<Arc<dyn SessionPool>>,
    ) -> Session {
        let (requests, mailbox) = mpsc::unbounded_channel();
        let actor = SessionActor {
            mailbox,
            conn,
            driver,
            server_session,
            wire_version,
            implicit: kind.is_implicit(),
            options,
            operation_time: None,
            state: TransactionState::None,
            pool,
        };
        tokio::spawn(actor.run());
        Session { requests }
    }

    /// Open a transaction: allocate the next transaction number and move to
    /// `Starting`. Fails without a state change if one is already open.
    pub async fn start_transaction(&self) -> Result<()> {
        self.call(|response| SessionRequest::StartTransaction { response })
            .await?
    }

    /// Decorate a command with this session's metadata and return it with
    /// the connection to execute it on. Binding the first statement of a
    /// transaction moves the state to `InProgress`.
    pub async fn bind_command(&self, command: Document) -> Result<(ConnectionHandle, Document)> {
        self.call(|response| SessionRequest::BindCommand { command, response })
            .await
    }

    /// Commit the open transaction.
    ///
    /// From `Starting` this resolves locally; from `InProgress` it runs
    /// commitTransaction against `admin`. The state advances to `Committed`
    /// either way, even when the wire call fails.
    pub async fn commit_transaction(&self) -> Result<()> {
        self.call(|response| SessionRequest::CommitTransaction { response })
            .await?
    }

    /// Abort the open transaction. Mirror of [`Session::commit_transaction`].
    pub async fn abort_transaction(&self) -> Result<()> {
        self.call(|response| SessionRequest::AbortTransaction { response })
            .await?
    }

    /// The connection this session is bound to
    pub async fn connection(&self) -> Result<ConnectionHandle> {
        self.call(|response| SessionRequest::Connection { response })
            .await
    }

    /// Snapshot of the server session plus the implicit marker
    pub async fn server_session(&self) -> Result<(ServerSession, bool)> {
        self.call(|response| SessionRequest::ServerSessionInfo { response })
            .await
    }

    /// Current transaction state
    pub async fn transaction_state(&self) -> Result<TransactionState> {
        self.call(|response| SessionRequest::TransactionState { response })
            .await
    }

    /// Advance the session's operation time.
    ///
    /// Fire-and-forget: the timestamp is applied only if it is strictly
    /// greater than the current value. Sends to a stopped actor are
    /// silently dropped.
    pub fn advance_operation_time(&self, timestamp: Timestamp) {
        let _ = self
            .requests
            .send(SessionRequest::AdvanceOperationTime { timestamp });
    }

    /// Observe a command reply for causal consistency.
    ///
    /// Extracts `operationTime` and advances the session clock, but only
    /// when the effective write concern acknowledges writes; unacknowledged
    /// writes carry no causal guarantee. The reply itself is never
    /// modified, and replaying the same reply is a no-op.
    pub fn update_session(&self, reply: &Document, options: &SessionOptions) {
        if !options.is_acknowledged() {
            return;
        }
        if let Ok(timestamp) = reply.get_timestamp("operationTime") {
            self.advance_operation_time(timestamp);
        }
    }

    /// Stop the session and recover its server session for check-in.
    pub async fn end_session(&self) -> Result<ServerSession> {
        self.call(|response| SessionRequest::EndSession { response })
            .await
    }

    /// Stop the session if it is implicit.
    ///
    /// On an explicit session this is a no-op returning `None`; it may be
    /// called repeatedly.
    pub async fn end_implicit_session(&self) -> Result<Option<ServerSession>> {
        self.call(|response| SessionRequest::EndImplicitSession { response })
            .await
    }

    async fn call<T>(
        &self,
        request: impl FnOnce(oneshot::Sender<T>) -> SessionRequest,
    ) -> Result<T> {
        let (response, reply) = oneshot::channel();
        self.requests
            .send(request(response))
            .map_err(|_| MongolineError::SessionClosed)?;
        reply.await.map_err(|_| MongolineError::SessionClosed)
    }
}

/// The per-session actor state
struct SessionActor {
    mailbox: mpsc::UnboundedReceiver<SessionRequest>,
    conn: ConnectionHandle,
    driver: Arc<dyn WireDriver>,
    server_session: ServerSession,
    wire_version: u32,
    implicit: bool,
    options: SessionOptions,
    operation_time: Option<Timestamp>,
    state: TransactionState,
    pool: Option<Arc<dyn SessionPool>>,
}

impl SessionActor {
    async fn run(mut self) {
        debug!(
            session_id = %self.server_session.session_id().simple(),
            implicit = self.implicit,
            "session actor started"
        );

        while let Some(request) = self.mailbox.recv().await {
            match request {
                SessionRequest::StartTransaction { response } => {
                    let _ = response.send(self.handle_start_transaction());
                }
                SessionRequest::BindCommand { command, response } => {
                    let decorated = decorate_command(
                        command,
                        self.state,
                        &self.server_session,
                        self.wire_version,
                        self.options.causal_consistency,
                        self.operation_time,
                    );
                    if self.state == TransactionState::Starting
                        && self.wire_version >= crate::wire::SESSIONS_MIN_WIRE_VERSION
                    {
                        self.state = TransactionState::InProgress;
                    }
                    let _ = response.send((self.conn.clone(), decorated));
                }
                SessionRequest::CommitTransaction { response } => {
                    let result = self.handle_commit_transaction().await;
                    let _ = response.send(result);
                }
                SessionRequest::AbortTransaction { response } => {
                    let result = self.handle_abort_transaction().await;
                    let _ = response.send(result);
                }
                SessionRequest::Connection { response } => {
                    let _ = response.send(self.conn.clone());
                }
                SessionRequest::ServerSessionInfo { response } => {
                    let _ = response.send((self.server_session.clone(), self.implicit));
                }
                SessionRequest::TransactionState { response } => {
                    let _ = response.send(self.state);
                }
                SessionRequest::AdvanceOperationTime { timestamp } => {
                    self.advance_operation_time(timestamp);
                }
                SessionRequest::EndSession { response } => {
                    self.abort_open_transaction("session ended").await;
                    let _ = response.send(self.server_session.clone());
                    return;
                }
                SessionRequest::EndImplicitSession { response } => {
                    if self.implicit {
                        self.abort_open_transaction("implicit session ended").await;
                        let _ = response.send(Some(self.server_session.clone()));
                        return;
                    }
                    let _ = response.send(None);
                }
            }
        }

        // Every handle dropped without an explicit end.
        self.abort_open_transaction("all session handles dropped")
            .await;
        if let Some(pool) = self.pool.take() {
            if let Err(error) = pool.checkin(self.server_session.clone()).await {
                warn!(
                    session_id = %self.server_session.session_id().simple(),
                    %error,
                    "failed to check orphaned session back into the pool"
                );
            }
        }
    }

    fn handle_start_transaction(&mut self) -> Result<()> {
        if !self.state.can_start_transaction() {
            return Err(MongolineError::TransactionInProgress);
        }
        self.server_session.next_txn_num();
        self.state = TransactionState::Starting;
        Ok(())
    }

    async fn handle_commit_transaction(&mut self) -> Result<()> {
        match self.state {
            TransactionState::Starting => {
                self.state = TransactionState::Committed;
                Ok(())
            }
            TransactionState::InProgress => {
                debug!(
                    session_id = %self.server_session.session_id().simple(),
                    txn_num = self.server_session.txn_num(),
                    "Running commit transaction"
                );
                let command = commit_command(&self.server_session, &self.options);
                let result = self
                    .driver
                    .exec_command(&self.conn, command, ADMIN_DATABASE)
                    .await;
                // The transition happens regardless of the wire outcome and
                // the command is never retried.
                self.state = TransactionState::Committed;
                result.map(|_| ())
            }
            _ => Err(MongolineError::NoTransactionStarted),
        }
    }

    async fn handle_abort_transaction(&mut self) -> Result<()> {
        match self.state {
            TransactionState::Starting => {
                self.state = TransactionState::Aborted;
                Ok(())
            }
            TransactionState::InProgress => {
                debug!(
                    session_id = %self.server_session.session_id().simple(),
                    txn_num = self.server_session.txn_num(),
                    "Running abort transaction"
                );
                let command = abort_command(&self.server_session, &self.options);
                let result = self
                    .driver
                    .exec_command(&self.conn, command, ADMIN_DATABASE)
                    .await;
                self.state = TransactionState::Aborted;
                result.map(|_| ())
            }
            _ => Err(MongolineError::NoTransactionStarted),
        }
    }

    /// Last-act cleanup before the actor stops: an in-progress transaction
    /// is aborted on the server, best-effort.
    async fn abort_open_transaction(&mut self, reason: &str) {
        debug!(
            session_id = %self.server_session.session_id().simple(),
            state = %self.state,
            reason,
            "session actor stopping"
        );
        if self.state.requires_end_command() {
            if let Err(error) = self.handle_abort_transaction().await {
                warn!(
                    session_id = %self.server_session.session_id().simple(),
                    %error,
                    "cleanup abort failed"
                );
            }
        }
    }

    fn advance_operation_time(&mut self, timestamp: Timestamp) {
        advance_operation_time(&mut self.operation_time, timestamp);
    }
}

/// Apply a newly observed operation time if it is strictly greater than the
/// current one under lexicographic ordering on (seconds, increment).
fn advance_operation_time(current: &mut Option<Timestamp>, candidate: Timestamp) {
    match *current {
        None => *current = Some(candidate),
        Some(held) if timestamp_is_after(candidate, held) => *current = Some(candidate),
        Some(_) => {}
    }
}

/// Lexicographic ordering on (seconds, increment)
fn timestamp_is_after(candidate: Timestamp, current: Timestamp) -> bool {
    (candidate.time, candidate.increment) > (current.time, current.increment)
}
