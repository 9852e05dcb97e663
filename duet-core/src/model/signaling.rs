use crate::model::peer::PeerId;
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}

/// Network path candidate, field-compatible with `RTCIceCandidateInit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidate {
    pub candidate: String,
    pub sdp_mid: Option<String>,
    pub sdp_m_line_index: Option<u16>,
    pub username_fragment: Option<String>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_m_line_index: None,
            username_fragment: None,
        }
    }
}

/// Text frames exchanged with the relay.
///
/// `Offer`, `Answer` and `Candidate` are forwarded verbatim to the other
/// members of the room. `PeerJoined` only ever reaches members that were
/// already present, which is what makes the side that stayed the initiator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d")]
pub enum SignalMessage {
    Welcome {
        peer_id: PeerId,
    },
    IceConfig {
        ice_servers: Vec<IceServerConfig>,
    },
    Join {
        room: RoomId,
    },
    Leave {
        room: RoomId,
    },
    PeerJoined {
        room: RoomId,
        peer_id: PeerId,
    },
    PeerLeft {
        room: RoomId,
        peer_id: PeerId,
    },
    RoomFull {
        room: RoomId,
    },
    Offer {
        room: RoomId,
        description: SessionDescription,
    },
    Answer {
        room: RoomId,
        description: SessionDescription,
    },
    Candidate {
        room: RoomId,
        candidate: IceCandidate,
    },
    Subscribe {
        topics: Vec<String>,
    },
    Unsubscribe {
        topics: Vec<String>,
    },
    Ping,
    Pong,
    Error {
        message: String,
    },
}

impl SignalMessage {
    /// Room the message is scoped to, if any.
    pub fn room(&self) -> Option<&RoomId> {
        match self {
            SignalMessage::Join { room }
            | SignalMessage::Leave { room }
            | SignalMessage::PeerJoined { room, .. }
            | SignalMessage::PeerLeft { room, .. }
            | SignalMessage::RoomFull { room }
            | SignalMessage::Offer { room, .. }
            | SignalMessage::Answer { room, .. }
            | SignalMessage::Candidate { room, .. } => Some(room),
            _ => None,
        }
    }
}
