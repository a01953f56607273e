//! Wire-protocol seam
//!
//! The session core never speaks to a server directly. It hands fully
//! decorated command documents to a [`WireDriver`] implementation, which
//! owns framing, pooling, and timeouts. This module defines that seam plus
//! the connection handle shared between a session and its callers.

use crate::error::Result;
use async_trait::async_trait;
use bson::Document;

/// Minimum wire version that understands session metadata.
///
/// Servers advertising a lower maxWireVersion (MongoDB 3.4 and older) get
/// commands with no `lsid` or transaction fields.
pub const SESSIONS_MIN_WIRE_VERSION: u32 = 6;

/// Database that commitTransaction/abortTransaction are dispatched against
pub const ADMIN_DATABASE: &str = "admin";

/// Handle to a pooled server connection.
///
/// The handle is shared read-only: a session keeps one copy for its own
/// commit/abort dispatch and hands clones to callers through
/// `bind_command`. Actual command execution on the connection is the wire
/// driver's responsibility.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionHandle {
    id: u64,
    address: String,
}

impl ConnectionHandle {
    pub fn new(id: u64, address: impl Into<String>) -> Self {
        Self {
            id,
            address: address.into(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

impl std::fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}@{}", self.id, self.address)
    }
}

/// Low-level command execution, implemented by the connection layer.
#[async_trait]
pub trait WireDriver: Send + Sync {
    /// Dispatch a command document against `database` on the given
    /// connection and return the server reply.
    async fn exec_command(
        &self,
        conn: &ConnectionHandle,
        command: Document,
        database: &str,
    ) -> Result<Document>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_handle_display() {
        let conn = ConnectionHandle::new(7, "localhost:27017");
        assert_eq!(conn.to_string(), "conn-7@localhost:27017");
        assert_eq!(conn.id(), 7);
        assert_eq!(conn.address(), "localhost:27017");
    }
}
