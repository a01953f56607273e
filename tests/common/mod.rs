//! Shared test fixtures for Mongoline integration tests
//!
//! In your test file, add:
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```
//!
//! - `RecordingDriver`: captures every dispatched command, replies from a script
//! - `TestPool`: single-connection session pool with checkout/checkin counters
//! - `spawn_session`: session actor wired to a recording driver, no pool

#![allow(dead_code)]

use async_trait::async_trait;
use bson::{doc, Document};
use mongoline::{
    ConnectionHandle, Result, ServerSession, Session, SessionCheckout, SessionKind,
    SessionOptions, SessionPool, SessionUse, WireDriver,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Wire driver fixture
// ============================================================================

/// A command the driver was asked to execute
#[derive(Debug, Clone)]
pub struct DispatchedCommand {
    pub database: String,
    pub command: Document,
}

/// Wire driver that records every dispatched command.
///
/// Replies come from a scripted queue; when the queue is empty the driver
/// answers `{ ok: 1 }`.
pub struct RecordingDriver {
    commands: Mutex<Vec<DispatchedCommand>>,
    replies: Mutex<VecDeque<Result<Document>>>,
}

impl RecordingDriver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            commands: Mutex::new(Vec::new()),
            replies: Mutex::new(VecDeque::new()),
        })
    }

    /// Queue the reply for the next dispatched command
    pub fn push_reply(&self, reply: Result<Document>) {
        self.replies.lock().push_back(reply);
    }

    pub fn commands(&self) -> Vec<DispatchedCommand> {
        self.commands.lock().clone()
    }

    pub fn command_count(&self) -> usize {
        self.commands.lock().len()
    }

    /// Number of dispatched commands whose verb is `name`
    pub fn count_of(&self, name: &str) -> usize {
        self.commands
            .lock()
            .iter()
            .filter(|dispatched| dispatched.command.contains_key(name))
            .count()
    }
}

#[async_trait]
impl WireDriver for RecordingDriver {
    async fn exec_command(
        &self,
        _conn: &ConnectionHandle,
        command: Document,
        database: &str,
    ) -> Result<Document> {
        self.commands.lock().push(DispatchedCommand {
            database: database.to_string(),
            command,
        });
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(doc! { "ok": 1 }))
    }
}

// ============================================================================
// Session pool fixture
// ============================================================================

/// Session pool over one connection with checkout/checkin accounting.
///
/// Can be scripted to answer `NewConnection` for the first N checkouts to
/// exercise the manager's retry discipline.
#[derive(Clone)]
pub struct TestPool {
    inner: Arc<PoolState>,
}

struct PoolState {
    driver: Arc<RecordingDriver>,
    wire_version: u32,
    reshuffles: Mutex<usize>,
    checkouts: Mutex<usize>,
    checkins: Mutex<Vec<ServerSession>>,
}

impl TestPool {
    pub fn new(driver: Arc<RecordingDriver>) -> Self {
        Self::with_wire_version(driver, 8)
    }

    pub fn with_wire_version(driver: Arc<RecordingDriver>, wire_version: u32) -> Self {
        init_tracing();
        Self {
            inner: Arc::new(PoolState {
                driver,
                wire_version,
                reshuffles: Mutex::new(0),
                checkouts: Mutex::new(0),
                checkins: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Answer `NewConnection` for the next `count` checkout attempts
    pub fn script_reshuffles(&self, count: usize) {
        *self.inner.reshuffles.lock() = count;
    }

    pub fn checkout_count(&self) -> usize {
        *self.inner.checkouts.lock()
    }

    pub fn checkin_count(&self) -> usize {
        self.inner.checkins.lock().len()
    }

    pub fn checked_in(&self) -> Vec<ServerSession> {
        self.inner.checkins.lock().clone()
    }

    pub fn as_pool(&self) -> Arc<dyn SessionPool> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl SessionPool for TestPool {
    async fn checkout(
        &self,
        _session_use: SessionUse,
        kind: SessionKind,
        options: &SessionOptions,
    ) -> Result<SessionCheckout> {
        {
            let mut reshuffles = self.inner.reshuffles.lock();
            if *reshuffles > 0 {
                *reshuffles -= 1;
                return Ok(SessionCheckout::NewConnection);
            }
        }
        *self.inner.checkouts.lock() += 1;
        let session = Session::start(
            ConnectionHandle::new(1, "localhost:27017"),
            self.inner.driver.clone(),
            ServerSession::new(),
            self.inner.wire_version,
            kind,
            options.clone(),
            Some(self.as_pool()),
        );
        Ok(SessionCheckout::Session(session))
    }

    async fn checkin(&self, server_session: ServerSession) -> Result<()> {
        self.inner.checkins.lock().push(server_session);
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Initialize test logging once; set RUST_LOG to see session actor output
pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .try_init();
    });
}

/// Spawn a session actor directly, without a pool behind it
pub fn spawn_session(
    driver: &Arc<RecordingDriver>,
    wire_version: u32,
    kind: SessionKind,
    options: SessionOptions,
) -> Session {
    init_tracing();
    Session::start(
        ConnectionHandle::new(1, "localhost:27017"),
        driver.clone(),
        ServerSession::new(),
        wire_version,
        kind,
        options,
        None,
    )
}

/// Poll `condition` until it holds, panicking after one second
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 1s");
}
