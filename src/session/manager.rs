//! Session manager
//!
//! Stateless helpers tying sessions to the topology pool: checkout with the
//! reshuffle retry discipline, the `with_transaction` convenience wrapper,
//! and the end/check-in pairs. Every path through `with_transaction`
//! releases the session, including an error or panic inside the user
//! function.

use super::actor::Session;
use super::options::SessionOptions;
use crate::error::{MongolineError, Result};
use crate::topology::{SessionCheckout, SessionKind, SessionPool, SessionUse};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, warn};

/// Maximum checkout attempts when the topology answers `NewConnection`.
///
/// The reshuffle signal is recoverable but unbounded retries could spin on
/// a flapping topology.
pub const MAX_CHECKOUT_RETRIES: usize = 3;

/// Check out an explicit session for user code.
pub async fn start_session(
    pool: &Arc<dyn SessionPool>,
    session_use: SessionUse,
    options: &SessionOptions,
) -> Result<Session> {
    checkout_with_retry(pool, session_use, SessionKind::Explicit, options).await
}

/// Check out an implicit session for a single operation.
///
/// When the caller already holds a session, that session is returned
/// verbatim: an explicit session subsumes an implicit one.
pub async fn start_implicit_session(
    pool: &Arc<dyn SessionPool>,
    session_use: SessionUse,
    existing: Option<Session>,
    options: &SessionOptions,
) -> Result<Session> {
    if let Some(session) = existing {
        return Ok(session);
    }
    checkout_with_retry(pool, session_use, SessionKind::Implicit, options).await
}

/// Run `transaction_fn` inside a transaction on a fresh write session.
///
/// On success the transaction is committed and the function's value
/// returned; on error or panic inside the function the transaction is
/// aborted and the error surfaces. The session is checked back into the
/// pool on every outcome.
pub async fn with_transaction<F, Fut, T>(
    pool: &Arc<dyn SessionPool>,
    options: &SessionOptions,
    transaction_fn: F,
) -> Result<T>
where
    F: FnOnce(Session) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let session = checkout_with_retry(pool, SessionUse::Write, SessionKind::Explicit, options).await?;
    let outcome = run_transaction(&session, transaction_fn).await;
    if let Err(error) = release(pool, &session).await {
        warn!(%error, "failed to check transaction session back into the pool");
    }
    outcome
}

/// End an explicit session and return its server session to the pool.
pub async fn end_session(pool: &Arc<dyn SessionPool>, session: Session) -> Result<()> {
    let server_session = session.end_session().await?;
    pool.checkin(server_session).await
}

/// End a session only if it is implicit.
///
/// Explicit sessions answer with a no-op and stay usable; no check-in
/// happens for them.
pub async fn end_implicit_session(pool: &Arc<dyn SessionPool>, session: Session) -> Result<()> {
    match session.end_implicit_session().await? {
        Some(server_session) => pool.checkin(server_session).await,
        None => Ok(()),
    }
}

async fn checkout_with_retry(
    pool: &Arc<dyn SessionPool>,
    session_use: SessionUse,
    kind: SessionKind,
    options: &SessionOptions,
) -> Result<Session> {
    for attempt in 1..=MAX_CHECKOUT_RETRIES {
        match pool.checkout(session_use, kind, options).await? {
            SessionCheckout::Session(session) => return Ok(session),
            SessionCheckout::NewConnection => {
                debug!(attempt, "topology replaced its connection during checkout, retrying");
            }
        }
    }
    Err(MongolineError::SessionCheckout(format!(
        "topology kept reshuffling after {} attempts",
        MAX_CHECKOUT_RETRIES
    )))
}

async fn run_transaction<F, Fut, T>(session: &Session, transaction_fn: F) -> Result<T>
where
    F: FnOnce(Session) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    session.start_transaction().await?;
    match AssertUnwindSafe(transaction_fn(session.clone()))
        .catch_unwind()
        .await
    {
        Ok(Ok(value)) => {
            session.commit_transaction().await?;
            Ok(value)
        }
        Ok(Err(error)) => {
            // Abort is best-effort; the caller sees the original error.
            let _ = session.abort_transaction().await;
            Err(error)
        }
        Err(payload) => {
            let _ = session.abort_transaction().await;
            Err(MongolineError::TransactionFn(panic_message(payload.as_ref())))
        }
    }
}

async fn release(pool: &Arc<dyn SessionPool>, session: &Session) -> Result<()> {
    let server_session = session.end_session().await?;
    pool.checkin(server_session).await
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "transaction function panicked".to_string()
    }
}
