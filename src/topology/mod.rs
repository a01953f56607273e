//! Topology seam
//!
//! Sessions are checked out of and back into a topology-owned pool. The
//! session core only sees the [`SessionPool`] trait: checkout hands back a
//! running [`Session`] (the pool picks the connection and wire version), and
//! checkin receives the recovered [`ServerSession`] once the session stops.
//!
//! A checkout can also answer [`SessionCheckout::NewConnection`] when the
//! topology replaced the underlying connection mid-checkout; that answer is
//! not an error, the session manager retries it.

use crate::error::Result;
use crate::session::{ServerSession, Session, SessionOptions};
use async_trait::async_trait;

/// Distinguishes sessions opened by user code from sessions auto-created
/// for a single operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    /// Created and ended by user code
    Explicit,
    /// Auto-created for one operation and returned to the pool afterwards
    Implicit,
}

impl SessionKind {
    pub fn is_implicit(&self) -> bool {
        matches!(self, SessionKind::Implicit)
    }
}

/// Whether the session will serve reads or writes; the pool uses this for
/// server selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionUse {
    Read,
    Write,
}

/// Outcome of a checkout request
pub enum SessionCheckout {
    /// A session bound to a live connection
    Session(Session),
    /// The topology reshuffled its connections while serving the request;
    /// retry the checkout
    NewConnection,
}

/// Pool of server sessions owned by the topology.
#[async_trait]
pub trait SessionPool: Send + Sync {
    /// Check out a session for the given use and kind.
    async fn checkout(
        &self,
        session_use: SessionUse,
        kind: SessionKind,
        options: &SessionOptions,
    ) -> Result<SessionCheckout>;

    /// Return a server session to the pool.
    async fn checkin(&self, server_session: ServerSession) -> Result<()>;
}
