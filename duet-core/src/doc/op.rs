use serde::{Deserialize, Serialize};

use crate::doc::DocumentError;
use crate::doc::id::{OpId, Stamp};
use crate::model::codec;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpKind {
    /// One character placed right after `origin` (`None` = document head).
    Insert { origin: Option<OpId>, ch: char },
    /// Tombstones the character created by `target`.
    Delete { target: OpId },
    Assign { register: String, value: String },
    /// Starts a new output epoch holding exactly `entries`.
    ReplaceLog { entries: Vec<String> },
    /// Adds one entry to the epoch started by `epoch` (`None` = initial epoch).
    AppendLog { epoch: Option<OpId>, entry: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Op {
    pub id: OpId,
    pub lamport: u64,
    pub kind: OpKind,
}

impl Op {
    pub fn stamp(&self) -> Stamp {
        Stamp {
            lamport: self.lamport,
            replica: self.id.replica,
        }
    }

    /// Operation that must be integrated before this one.
    pub(crate) fn dependency(&self) -> Option<OpId> {
        match &self.kind {
            OpKind::Insert { origin, .. } => *origin,
            OpKind::Delete { target } => Some(*target),
            OpKind::AppendLog { epoch, .. } => *epoch,
            OpKind::Assign { .. } | OpKind::ReplaceLog { .. } => None,
        }
    }
}

/// Unit of broadcast: every op produced by one local transaction, or the
/// ops a peer is missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocUpdate {
    pub ops: Vec<Op>,
}

impl DocUpdate {
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn encode(&self) -> Result<Vec<u8>, DocumentError> {
        Ok(codec::to_bytes(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DocumentError> {
        Ok(codec::from_bytes(bytes)?)
    }
}
