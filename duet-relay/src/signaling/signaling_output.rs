use async_trait::async_trait;
use duet_core::{PeerId, SignalMessage};

/// Lets a room reach connected peers without knowing about sockets.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// Delivers `message` to one peer. Unknown peers are ignored.
    async fn send(&self, peer_id: &PeerId, message: SignalMessage);
}
