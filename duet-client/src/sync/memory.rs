use crate::TransportError;
use crate::sync::{SyncTransport, TransportEvent};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::debug;

/// In-process pub/sub shared by [`MemoryTransport`]s, for running several
/// replicas inside one process.
#[derive(Clone, Default)]
pub struct MemoryHub {
    state: Arc<Mutex<HubState>>,
    next_id: Arc<AtomicU64>,
}

#[derive(Default)]
struct HubState {
    topics: HashMap<String, Vec<Member>>,
}

struct Member {
    transport: u64,
    online: Arc<AtomicBool>,
    duplicate: Arc<AtomicBool>,
    tx: mpsc::UnboundedSender<TransportEvent>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transport(&self) -> MemoryTransport {
        MemoryTransport {
            hub: self.clone(),
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            online: Arc::new(AtomicBool::new(true)),
            duplicate: Arc::new(AtomicBool::new(false)),
        }
    }

    fn deliver(&self, from: u64, topic: &str, payload: Bytes) {
        let state = self.state.lock();
        let Some(members) = state.topics.get(topic) else {
            return;
        };
        for member in members {
            if member.transport == from || !member.online.load(Ordering::SeqCst) {
                continue;
            }
            let _ = member.tx.send(TransportEvent::Message(payload.clone()));
            if member.duplicate.load(Ordering::SeqCst) {
                let _ = member.tx.send(TransportEvent::Message(payload.clone()));
            }
        }
    }
}

/// One participant's connection to a [`MemoryHub`]. Can be switched offline
/// to simulate a network partition.
#[derive(Clone)]
pub struct MemoryTransport {
    hub: MemoryHub,
    id: u64,
    online: Arc<AtomicBool>,
    duplicate: Arc<AtomicBool>,
}

impl MemoryTransport {
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Going offline drops traffic in both directions until back online.
    pub fn set_online(&self, online: bool) {
        if self.online.swap(online, Ordering::SeqCst) == online {
            return;
        }
        debug!("Memory transport {} is now {}", self.id, if online { "online" } else { "offline" });
        let event = if online {
            TransportEvent::Connected
        } else {
            TransportEvent::Disconnected
        };
        let state = self.hub.state.lock();
        for member in state.topics.values().flatten() {
            if member.transport == self.id {
                let _ = member.tx.send(event.clone());
            }
        }
    }

    /// Delivers every inbound frame twice.
    pub fn set_duplicate_delivery(&self, duplicate: bool) {
        self.duplicate.store(duplicate, Ordering::SeqCst);
    }
}

#[async_trait]
impl SyncTransport for MemoryTransport {
    async fn join(&self, topic: &str) -> Result<mpsc::UnboundedReceiver<TransportEvent>, TransportError> {
        let (tx, rx) = mpsc::unbounded_channel();
        if self.is_online() {
            let _ = tx.send(TransportEvent::Connected);
        }

        let mut state = self.hub.state.lock();
        let members = state.topics.entry(topic.to_owned()).or_default();
        members.retain(|m| m.transport != self.id);
        members.push(Member {
            transport: self.id,
            online: self.online.clone(),
            duplicate: self.duplicate.clone(),
            tx,
        });
        Ok(rx)
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        if !self.is_online() {
            return Err(TransportError::Offline);
        }
        self.hub.deliver(self.id, topic, Bytes::from(payload));
        Ok(())
    }

    async fn leave(&self, topic: &str) {
        let mut state = self.hub.state.lock();
        if let Some(members) = state.topics.get_mut(topic) {
            members.retain(|m| m.transport != self.id);
            if members.is_empty() {
                state.topics.remove(topic);
            }
        }
    }
}
