use crate::doc::ReplicaId;
use crate::model::codec::{self, CodecError};
use serde::{Deserialize, Serialize};

/// Binary relay frame: a payload published to (or delivered from) a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicFrame {
    pub topic: String,
    #[serde(with = "serde_bytes")]
    pub payload: Vec<u8>,
}

impl TopicFrame {
    pub fn new(topic: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        codec::to_bytes(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        codec::from_bytes(bytes)
    }
}

/// Ephemeral presence of one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceState {
    pub label: String,
    pub color: String,
}

/// `state: None` announces that the sender went away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwarenessUpdate {
    pub clock: u64,
    pub state: Option<PresenceState>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncPacket {
    /// Sent on attach and after every reconnect; answered with `SyncStep2`
    /// and the receiver's own `SyncStep1`.
    Hello {
        #[serde(with = "serde_bytes")]
        state_vector: Vec<u8>,
    },
    SyncStep1 {
        #[serde(with = "serde_bytes")]
        state_vector: Vec<u8>,
    },
    SyncStep2 {
        #[serde(with = "serde_bytes")]
        update: Vec<u8>,
    },
    Update {
        #[serde(with = "serde_bytes")]
        update: Vec<u8>,
    },
    Awareness(AwarenessUpdate),
}

/// Payload of a sync topic frame. `to: None` addresses every subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncEnvelope {
    pub from: ReplicaId,
    pub to: Option<ReplicaId>,
    pub packet: SyncPacket,
}

impl SyncEnvelope {
    pub fn broadcast(from: ReplicaId, packet: SyncPacket) -> Self {
        Self {
            from,
            to: None,
            packet,
        }
    }

    pub fn direct(from: ReplicaId, to: ReplicaId, packet: SyncPacket) -> Self {
        Self {
            from,
            to: Some(to),
            packet,
        }
    }

    pub fn is_for(&self, replica: ReplicaId) -> bool {
        self.from != replica && self.to.is_none_or(|to| to == replica)
    }

    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        codec::to_bytes(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        codec::from_bytes(bytes)
    }
}
