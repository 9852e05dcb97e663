use crate::TransportError;
use async_trait::async_trait;
use duet_core::{IceServerConfig, SignalMessage};
use tokio::sync::mpsc;

pub type ListenerId = u64;

/// Inbound signaling registered with [`Signaling::listen`]. Every listener
/// receives every message; the stream ends when the connection is closed.
#[derive(Debug)]
pub struct SignalListener {
    pub id: ListenerId,
    pub rx: mpsc::UnboundedReceiver<SignalMessage>,
}

/// Engine side of the relay connection.
#[async_trait]
pub trait Signaling: Send + Sync {
    async fn send(&self, message: SignalMessage) -> Result<(), TransportError>;

    fn listen(&self) -> SignalListener;

    fn unlisten(&self, id: ListenerId);

    /// ICE servers pushed by the relay, once received.
    fn ice_servers(&self) -> Option<Vec<IceServerConfig>>;
}
