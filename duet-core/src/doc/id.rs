use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::doc::DocumentError;
use crate::model::codec;

/// Identity of one document replica. Also the final tie-break between
/// concurrent operations, so it must be unique per attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReplicaId(pub u64);

impl ReplicaId {
    pub fn random() -> Self {
        Self(Uuid::new_v4().as_u64_pair().0)
    }
}

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Stable identifier of an operation: the n-th op authored by a replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OpId {
    pub replica: ReplicaId,
    pub seq: u64,
}

/// Total order over operations: Lamport time first, replica id second.
///
/// Field order matters for the derived `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Stamp {
    pub lamport: u64,
    pub replica: ReplicaId,
}

/// Highest contiguous sequence number integrated per replica.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionVector(BTreeMap<ReplicaId, u64>);

impl VersionVector {
    pub fn get(&self, replica: ReplicaId) -> u64 {
        self.0.get(&replica).copied().unwrap_or(0)
    }

    pub fn contains(&self, id: OpId) -> bool {
        id.seq <= self.get(id.replica)
    }

    pub(crate) fn advance(&mut self, id: OpId) {
        let seen = self.0.entry(id.replica).or_insert(0);
        *seen = (*seen).max(id.seq);
    }

    pub fn encode(&self) -> Result<Vec<u8>, DocumentError> {
        Ok(codec::to_bytes(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DocumentError> {
        Ok(codec::from_bytes(bytes)?)
    }
}
