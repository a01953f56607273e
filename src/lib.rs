#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

//! # Mongoline
//!
//! Mongoline is the client-side session and transaction core of a MongoDB
//! driver: per-session actors that own a server-assigned logical session id,
//! sequence transaction numbers, enforce the transaction lifecycle, stamp
//! outgoing commands with session metadata, and keep the causal-consistency
//! clock.
//!
//! ## Library Usage
//!
//! ```no_run
//! use mongoline::{session, SessionOptions, SessionPool};
//! use bson::doc;
//! use std::sync::Arc;
//!
//! async fn transfer(pool: Arc<dyn SessionPool>) -> mongoline::Result<()> {
//!     session::with_transaction(&pool, &SessionOptions::default(), |session| async move {
//!         let (conn, command) = session
//!             .bind_command(doc! { "insert": "ledger", "documents": [{ "delta": -100 }] })
//!             .await?;
//!         // hand (conn, command) to the wire driver here
//!         let _ = (conn, command);
//!         Ok(())
//!     })
//!     .await
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`session`]: session actor, state machine, command decoration, manager
//! - [`topology`]: pool seam the sessions are checked out of and into
//! - [`wire`]: connection handle and command-execution seam
//! - [`error`]: error types and Result alias
//!
//! The BSON codec (`bson`), the low-level connection driver, and the
//! topology manager are collaborators behind traits; this crate contains no
//! networking of its own.

pub mod error;
pub mod session;
pub mod topology;
pub mod wire;

pub use error::{MongolineError, Result};
pub use session::{
    ServerSession, Session, SessionOptions, TransactionState, WriteAcknowledgment, WriteConcern,
};
pub use topology::{SessionCheckout, SessionKind, SessionPool, SessionUse};
pub use wire::{ConnectionHandle, WireDriver, ADMIN_DATABASE, SESSIONS_MIN_WIRE_VERSION};
