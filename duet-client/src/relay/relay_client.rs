use crate::TransportError;
use crate::config::ReconnectConfig;
use crate::relay::{ListenerId, SignalListener, Signaling};
use crate::sync::{SyncTransport, TransportEvent};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use duet_core::{IceServerConfig, PeerId, SignalMessage, TopicFrame};
use futures::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection to the relay, shared by the session and sync engines.
///
/// Created explicitly and disposed with [`RelayClient::close`]. A dropped
/// connection is re-established with exponential backoff and topic
/// subscriptions are restored; room memberships are not.
#[derive(Clone)]
pub struct RelayClient {
    inner: Arc<RelayInner>,
}

struct RelayInner {
    url: String,
    outbound: mpsc::UnboundedSender<Message>,
    listeners: DashMap<ListenerId, mpsc::UnboundedSender<SignalMessage>>,
    topics: DashMap<String, mpsc::UnboundedSender<TransportEvent>>,
    next_listener: AtomicU64,
    peer_id: RwLock<Option<PeerId>>,
    ice_servers: RwLock<Option<Vec<IceServerConfig>>>,
    connected: watch::Sender<bool>,
    closing: watch::Sender<bool>,
    closed: AtomicBool,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

enum SessionEnd {
    Lost,
    Shutdown,
}

impl RelayClient {
    /// Starts connecting in the background and returns immediately.
    pub fn connect(url: impl Into<String>, reconnect: ReconnectConfig) -> Self {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (connected, _) = watch::channel(false);
        let (closing, _) = watch::channel(false);

        let inner = Arc::new(RelayInner {
            url: url.into(),
            outbound,
            listeners: DashMap::new(),
            topics: DashMap::new(),
            next_listener: AtomicU64::new(1),
            peer_id: RwLock::new(None),
            ice_servers: RwLock::new(None),
            connected,
            closing,
            closed: AtomicBool::new(false),
            supervisor: Mutex::new(None),
        });

        let handle = tokio::spawn(supervise(inner.clone(), outbound_rx, reconnect));
        *inner.supervisor.lock() = Some(handle);

        Self { inner }
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    pub fn is_connected(&self) -> bool {
        *self.inner.connected.borrow()
    }

    /// Id the relay assigned to the current connection.
    pub fn peer_id(&self) -> Option<PeerId> {
        self.inner.peer_id.read().clone()
    }

    pub async fn wait_connected(&self, timeout: Duration) -> Result<(), TransportError> {
        let mut connected = self.inner.connected.subscribe();
        match tokio::time::timeout(timeout, connected.wait_for(|c| *c)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) => Err(TransportError::Closed),
            Err(_) => Err(TransportError::Offline),
        }
    }

    /// Closes the connection and ends every listener and subscription.
    /// Repeated calls return immediately.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Closing relay connection to {}", self.inner.url);
        self.inner.closing.send_replace(true);

        let handle = self.inner.supervisor.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.inner.closed.load(Ordering::SeqCst) {
            Err(TransportError::Closed)
        } else if !self.is_connected() {
            Err(TransportError::Offline)
        } else {
            Ok(())
        }
    }

    fn enqueue(&self, message: Message) -> Result<(), TransportError> {
        self.inner
            .outbound
            .send(message)
            .map_err(|_| TransportError::Closed)
    }
}

#[async_trait]
impl Signaling for RelayClient {
    async fn send(&self, message: SignalMessage) -> Result<(), TransportError> {
        self.ensure_open()?;
        let json = serde_json::to_string(&message)?;
        debug!("Sending signal: {}", json);
        self.enqueue(Message::Text(json.into()))
    }

    fn listen(&self) -> SignalListener {
        let id = self.inner.next_listener.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded_channel();
        if !self.inner.closed.load(Ordering::SeqCst) {
            self.inner.listeners.insert(id, tx);
        }
        SignalListener { id, rx }
    }

    fn unlisten(&self, id: ListenerId) {
        self.inner.listeners.remove(&id);
    }

    fn ice_servers(&self) -> Option<Vec<IceServerConfig>> {
        self.inner.ice_servers.read().clone()
    }
}

#[async_trait]
impl SyncTransport for RelayClient {
    async fn join(&self, topic: &str) -> Result<mpsc::UnboundedReceiver<TransportEvent>, TransportError> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.topics.insert(topic.to_owned(), tx.clone());

        if self.is_connected() {
            let subscribe = SignalMessage::Subscribe {
                topics: vec![topic.to_owned()],
            };
            self.enqueue(Message::Text(serde_json::to_string(&subscribe)?.into()))?;
            let _ = tx.send(TransportEvent::Connected);
        }
        debug!("Joined topic {}", topic);
        Ok(rx)
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        self.ensure_open()?;
        let frame = TopicFrame::new(topic, payload).encode()?;
        self.enqueue(Message::Binary(frame.into()))
    }

    async fn leave(&self, topic: &str) {
        if self.inner.topics.remove(topic).is_none() || !self.is_connected() {
            return;
        }
        let unsubscribe = SignalMessage::Unsubscribe {
            topics: vec![topic.to_owned()],
        };
        if let Ok(json) = serde_json::to_string(&unsubscribe) {
            let _ = self.enqueue(Message::Text(json.into()));
        }
    }
}

impl RelayInner {
    fn dispatch_text(&self, text: &str) {
        let message = match serde_json::from_str::<SignalMessage>(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Invalid SignalMessage from relay: {:?}", e);
                return;
            }
        };

        match &message {
            SignalMessage::Welcome { peer_id } => {
                info!("Relay assigned peer id {}", peer_id);
                *self.peer_id.write() = Some(peer_id.clone());
            }
            SignalMessage::IceConfig { ice_servers } => {
                *self.ice_servers.write() = Some(ice_servers.clone());
            }
            _ => {}
        }

        self.listeners
            .retain(|_, tx| tx.send(message.clone()).is_ok());
    }

    fn dispatch_binary(&self, data: &[u8]) {
        let frame = match TopicFrame::decode(data) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Invalid topic frame from relay: {}", e);
                return;
            }
        };
        if let Some(tx) = self.topics.get(&frame.topic) {
            let _ = tx.send(TransportEvent::Message(Bytes::from(frame.payload)));
        }
    }

    fn notify_topics(&self, event: TransportEvent) {
        for entry in self.topics.iter() {
            let _ = entry.value().send(event.clone());
        }
    }

    fn subscribe_frame(&self) -> Option<Message> {
        let topics: Vec<String> = self.topics.iter().map(|e| e.key().clone()).collect();
        if topics.is_empty() {
            return None;
        }
        serde_json::to_string(&SignalMessage::Subscribe { topics })
            .ok()
            .map(|json| Message::Text(json.into()))
    }
}

async fn supervise(
    inner: Arc<RelayInner>,
    mut outbound: mpsc::UnboundedReceiver<Message>,
    reconnect: ReconnectConfig,
) {
    let mut closing = inner.closing.subscribe();
    let mut delay = reconnect.initial_delay();

    loop {
        if *closing.borrow() {
            break;
        }

        match connect_async(inner.url.as_str()).await {
            Ok((socket, _)) => {
                info!("Connected to relay {}", inner.url);
                delay = reconnect.initial_delay();

                // frames queued for the previous connection are stale
                while outbound.try_recv().is_ok() {}

                let end = run_connection(&inner, socket, &mut outbound, &mut closing).await;

                inner.connected.send_replace(false);
                inner.notify_topics(TransportEvent::Disconnected);
                *inner.peer_id.write() = None;

                if let SessionEnd::Shutdown = end {
                    break;
                }
                warn!("Lost relay connection, reconnecting in {:?}", delay);
            }
            Err(e) => warn!("Failed to connect to relay {}: {}", inner.url, e),
        }

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = closing.changed() => break,
        }
        delay = (delay * 2).min(reconnect.max_delay());
    }

    inner.listeners.clear();
    inner.topics.clear();
    debug!("Relay supervisor for {} terminated", inner.url);
}

async fn run_connection(
    inner: &RelayInner,
    socket: WsStream,
    outbound: &mut mpsc::UnboundedReceiver<Message>,
    closing: &mut watch::Receiver<bool>,
) -> SessionEnd {
    let (mut write, mut read) = socket.split();

    // flag first: a topic joined from now on enqueues its own Subscribe
    inner.connected.send_replace(true);
    if let Some(subscribe) = inner.subscribe_frame()
        && write.send(subscribe).await.is_err()
    {
        return SessionEnd::Lost;
    }
    inner.notify_topics(TransportEvent::Connected);

    loop {
        tokio::select! {
            _ = closing.changed() => {
                let _ = write.send(Message::Close(None)).await;
                return SessionEnd::Shutdown;
            }
            message = outbound.recv() => match message {
                Some(message) => {
                    if let Err(e) = write.send(message).await {
                        warn!("Failed to send to relay: {}", e);
                        return SessionEnd::Lost;
                    }
                }
                None => return SessionEnd::Shutdown,
            },
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => inner.dispatch_text(text.as_str()),
                Some(Ok(Message::Binary(data))) => inner.dispatch_binary(&data),
                Some(Ok(Message::Close(_))) | None => return SessionEnd::Lost,
                Some(Err(e)) => {
                    warn!("Relay connection error: {}", e);
                    return SessionEnd::Lost;
                }
                Some(Ok(_)) => {}
            },
        }
    }
}
