pub(crate) mod codec;
mod packet;
mod peer;
mod room;
mod signaling;

pub use codec::CodecError;
pub use packet::{AwarenessUpdate, PresenceState, SyncEnvelope, SyncPacket, TopicFrame};
pub use peer::PeerId;
pub use room::RoomId;
pub use signaling::{IceCandidate, IceServerConfig, SdpKind, SessionDescription, SignalMessage};
