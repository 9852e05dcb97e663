use duet_core::{PeerId, SignalMessage};

/// Commands a room receives from the signaling service.
#[derive(Debug)]
pub enum RoomCommand {
    /// A peer asks for media membership.
    Join { peer_id: PeerId },

    /// Offer, answer or candidate to forward to the other members.
    Signal {
        peer_id: PeerId,
        message: SignalMessage,
    },

    /// Explicit leave or socket drop.
    Leave { peer_id: PeerId },
}

impl RoomCommand {
    pub fn peer_id(&self) -> &PeerId {
        match self {
            RoomCommand::Join { peer_id }
            | RoomCommand::Signal { peer_id, .. }
            | RoomCommand::Leave { peer_id } => peer_id,
        }
    }
}
