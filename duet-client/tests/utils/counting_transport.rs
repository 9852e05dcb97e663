use async_trait::async_trait;
use duet_client::TransportError;
use duet_client::sync::{MemoryTransport, SyncTransport, TransportEvent};
use duet_core::{SyncEnvelope, SyncPacket};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;

/// Memory transport that counts the document updates it publishes.
#[derive(Clone)]
pub struct CountingTransport {
    inner: MemoryTransport,
    updates: Arc<AtomicUsize>,
}

impl CountingTransport {
    pub fn new(inner: MemoryTransport) -> Self {
        Self {
            inner,
            updates: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// `SyncPacket::Update` frames published so far.
    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SyncTransport for CountingTransport {
    async fn join(&self, topic: &str) -> Result<mpsc::UnboundedReceiver<TransportEvent>, TransportError> {
        self.inner.join(topic).await
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        if let Ok(envelope) = SyncEnvelope::decode(&payload)
            && matches!(envelope.packet, SyncPacket::Update { .. })
        {
            self.updates.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.publish(topic, payload).await
    }

    async fn leave(&self, topic: &str) {
        self.inner.leave(topic).await
    }
}
