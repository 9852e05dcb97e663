use crate::TransportError;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The topic is reachable (again). Sent once per (re)connection.
    Connected,
    Disconnected,
    Message(Bytes),
}

/// Best-effort pub/sub carrying document updates. Delivery may be delayed,
/// duplicated or reordered; nothing published while offline is retained.
#[async_trait]
pub trait SyncTransport: Send + Sync {
    /// Subscribes to `topic`. A second join of the same topic replaces the
    /// first subscription.
    async fn join(&self, topic: &str) -> Result<mpsc::UnboundedReceiver<TransportEvent>, TransportError>;

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError>;

    async fn leave(&self, topic: &str);
}
