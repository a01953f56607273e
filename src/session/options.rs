//! Session options and write-concern assembly
//!
//! Options mirror what user code can attach to a session: the causal
//! consistency flag, the commit time limit, and the write-concern fields
//! that end up on commitTransaction/abortTransaction.

use bson::{Bson, Document};
use serde::{Deserialize, Serialize};

/// Acknowledgment level requested from the server for writes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WriteAcknowledgment {
    /// Number of nodes that must acknowledge; `0` is unacknowledged
    Nodes(i32),
    /// A named concern such as `"majority"`
    Mode(String),
}

/// Write concern attached to commit/abort commands.
///
/// Assembled into a `writeConcern` subdocument with the wire field names
/// `w`, `wtimeout`, and `j`. An empty concern produces no subdocument at
/// all, so the wire driver never sees placeholder entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteConcern {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w: Option<WriteAcknowledgment>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wtimeout_ms: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<bool>,
}

impl WriteConcern {
    /// Whether writes under this concern are acknowledged by the server.
    ///
    /// Only `w: 0` opts out; every other setting (including the default)
    /// carries a causal guarantee.
    pub fn is_acknowledged(&self) -> bool {
        !matches!(self.w, Some(WriteAcknowledgment::Nodes(0)))
    }

    /// Assemble the `writeConcern` subdocument, or `None` if no field is set.
    pub fn to_document(&self) -> Option<Document> {
        let mut concern = Document::new();
        match &self.w {
            Some(WriteAcknowledgment::Nodes(n)) => {
                concern.insert("w", Bson::Int32(*n));
            }
            Some(WriteAcknowledgment::Mode(mode)) => {
                concern.insert("w", Bson::String(mode.clone()));
            }
            None => {}
        }
        if let Some(wtimeout) = self.wtimeout_ms {
            concern.insert("wtimeout", Bson::Int64(wtimeout));
        }
        if let Some(journal) = self.journal {
            concern.insert("j", Bson::Boolean(journal));
        }
        if concern.is_empty() {
            None
        } else {
            Some(concern)
        }
    }
}

/// Options recognized when opening a session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionOptions {
    /// Pin reads to the last observed operation time
    #[serde(default)]
    pub causal_consistency: bool,

    /// Time limit forwarded to commitTransaction as `maxTimeMS`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_commit_time_ms: Option<i64>,

    /// Write concern for commit/abort
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_concern: Option<WriteConcern>,
}

impl SessionOptions {
    /// Options with causal consistency enabled
    pub fn causal() -> Self {
        Self {
            causal_consistency: true,
            ..Self::default()
        }
    }

    /// Whether the effective write concern is acknowledged.
    ///
    /// No explicit concern means the server default, which acknowledges.
    pub fn is_acknowledged(&self) -> bool {
        self.write_concern
            .as_ref()
            .map_or(true, WriteConcern::is_acknowledged)
    }

    /// The `writeConcern` subdocument for commit/abort, if any field is set
    pub fn write_concern_doc(&self) -> Option<Document> {
        self.write_concern.as_ref().and_then(WriteConcern::to_document)
    }
}
