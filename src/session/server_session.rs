//! Server session record
//!
//! A [`ServerSession`] is the client-side record of a server-recognized
//! logical session: the 16-byte session id (`lsid`) and the last allocated
//! transaction number. It is exclusively owned by one session actor at a
//! time and transfers back to the topology pool when the session ends.

use bson::spec::BinarySubtype;
use bson::{doc, Binary, Bson, Document};
use uuid::Uuid;

/// Client-side record of a logical session on the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSession {
    /// Session identifier, immutable after creation
    session_id: Uuid,
    /// Last allocated transaction number, strictly increasing
    txn_num: i64,
}

impl ServerSession {
    /// Create a session with a fresh random identifier and no transactions.
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            txn_num: 0,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn txn_num(&self) -> i64 {
        self.txn_num
    }

    /// Allocate the next transaction number.
    ///
    /// Pre-increments and returns the new value. The counter is 64-bit and
    /// never wraps within any realistic session lifetime.
    pub fn next_txn_num(&mut self) -> i64 {
        self.txn_num += 1;
        self.txn_num
    }

    /// Render the `lsid` subdocument: `{ id: <binary subtype 4> }`.
    pub fn session_id_doc(&self) -> Document {
        doc! {
            "id": Bson::Binary(Binary {
                subtype: BinarySubtype::Uuid,
                bytes: self.session_id.as_bytes().to_vec(),
            }),
        }
    }
}

impl Default for ServerSession {
    fn default() -> Self {
        Self::new()
    }
}
