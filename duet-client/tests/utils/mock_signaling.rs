use async_trait::async_trait;
use duet_client::TransportError;
use duet_client::relay::{ListenerId, SignalListener, Signaling};
use duet_core::{IceServerConfig, SignalMessage};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Mock relay connection: records what the engine sends and lets the test
/// inject what the relay would deliver.
#[derive(Clone)]
pub struct MockSignaling {
    inner: Arc<MockSignalingInner>,
}

struct MockSignalingInner {
    sent_tx: mpsc::UnboundedSender<SignalMessage>,
    sent: Mutex<Vec<SignalMessage>>,
    listeners: Mutex<HashMap<ListenerId, mpsc::UnboundedSender<SignalMessage>>>,
    next_listener: AtomicU64,
    ice_servers: Mutex<Option<Vec<IceServerConfig>>>,
    offline: AtomicBool,
}

impl MockSignaling {
    /// Create a new MockSignaling and the channel of messages it sends.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SignalMessage>) {
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let signaling = Self {
            inner: Arc::new(MockSignalingInner {
                sent_tx,
                sent: Mutex::new(Vec::new()),
                listeners: Mutex::new(HashMap::new()),
                next_listener: AtomicU64::new(1),
                ice_servers: Mutex::new(None),
                offline: AtomicBool::new(false),
            }),
        };
        (signaling, sent_rx)
    }

    /// Delivers `message` to every listener, as the relay would.
    pub fn inject(&self, message: SignalMessage) {
        for tx in self.inner.listeners.lock().unwrap().values() {
            let _ = tx.send(message.clone());
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().unwrap().len()
    }

    pub fn sent(&self) -> Vec<SignalMessage> {
        self.inner.sent.lock().unwrap().clone()
    }

    /// While offline every send fails the way an unreachable relay does.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    pub fn set_ice_servers(&self, ice_servers: Vec<IceServerConfig>) {
        *self.inner.ice_servers.lock().unwrap() = Some(ice_servers);
    }
}

#[async_trait]
impl Signaling for MockSignaling {
    async fn send(&self, message: SignalMessage) -> Result<(), TransportError> {
        tracing::debug!("[MockSignaling] send: {:?}", message);
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(TransportError::Offline);
        }
        self.inner.sent.lock().unwrap().push(message.clone());
        let _ = self.inner.sent_tx.send(message);
        Ok(())
    }

    fn listen(&self) -> SignalListener {
        let id = self.inner.next_listener.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.listeners.lock().unwrap().insert(id, tx);
        SignalListener { id, rx }
    }

    fn unlisten(&self, id: ListenerId) {
        self.inner.listeners.lock().unwrap().remove(&id);
    }

    fn ice_servers(&self) -> Option<Vec<IceServerConfig>> {
        self.inner.ice_servers.lock().unwrap().clone()
    }
}
