//! Shared document synchronization: a replica per attached room, kept
//! convergent over a [`SyncTransport`] and projected into an editor buffer,
//! a language register and an output log.

use crate::config::SyncConfig;
use crate::exec::{CodeExecutor, ExecutionRequest, output_lines};
use crate::sync::{Awareness, EditRoute, EditorBinding, SyncTransport, TextBuffer};
use crate::{SyncError, TransportError};
use duet_core::doc::{DocumentBackend, LocalOp, Replica, ReplicaId, TextSplice};
use duet_core::utils::LANGUAGE_REGISTER;
use duet_core::{PresenceState, RoomId, SyncEnvelope, SyncPacket};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

mod actor_impl;
mod local_impl;

use actor_impl::SyncActor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStatus {
    Connecting,
    Synced,
    Offline,
}

pub struct SyncEngine {
    transport: Arc<dyn SyncTransport>,
    executor: Arc<dyn CodeExecutor>,
    config: SyncConfig,
}

impl SyncEngine {
    pub fn new(
        transport: Arc<dyn SyncTransport>,
        executor: Arc<dyn CodeExecutor>,
        config: SyncConfig,
    ) -> Self {
        Self {
            transport,
            executor,
            config,
        }
    }

    /// Joins the room's document with a fresh replica.
    pub async fn attach(&self, room: &RoomId) -> Result<SyncHandle, TransportError> {
        self.attach_with(room, Replica::new(ReplicaId::random()))
            .await
    }

    pub async fn attach_with<D: DocumentBackend>(
        &self,
        room: &RoomId,
        doc: D,
    ) -> Result<SyncHandle, TransportError> {
        let topic = room.sync_topic();
        let events = self.transport.join(&topic).await?;
        let replica = doc.replica_id();

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (language, _) = watch::channel(doc.register(LANGUAGE_REGISTER));
        let (output, _) = watch::channel(doc.output());
        let (peers, _) = watch::channel(0);
        let (status, _) = watch::channel(SyncStatus::Connecting);

        let inner = Arc::new(SyncInner {
            room: room.clone(),
            topic: topic.clone(),
            replica,
            state: Mutex::new(DocState {
                doc: Some(Box::new(doc)),
                binding: None,
            }),
            outbound: outbound_tx,
            transport: self.transport.clone(),
            executor: self.executor.clone(),
            awareness: Mutex::new(Awareness::new(Awareness::random_presence())),
            language,
            output,
            peers,
            status,
            detached: AtomicBool::new(false),
            next_binding: AtomicU64::new(1),
            publisher: Mutex::new(None),
            actor: Mutex::new(None),
        });

        let publisher = tokio::spawn(publish_loop(self.transport.clone(), topic, outbound_rx));
        *inner.publisher.lock() = Some(publisher);

        let actor = SyncActor::new(
            Arc::downgrade(&inner),
            events,
            self.config.clone(),
            Instant::now() + self.config.seed_grace(),
        );
        *inner.actor.lock() = Some(tokio::spawn(actor.run()));

        info!("Attached replica {} to room {}", replica, room);
        Ok(SyncHandle { inner })
    }
}

pub(crate) struct DocState {
    doc: Option<Box<dyn DocumentBackend>>,
    binding: Option<BoundBuffer>,
}

struct BoundBuffer {
    id: u64,
    buffer: Box<dyn TextBuffer>,
}

enum Outbound {
    Frame(Vec<u8>),
    Close,
}

pub(crate) struct SyncInner {
    room: RoomId,
    topic: String,
    replica: ReplicaId,
    state: Mutex<DocState>,
    outbound: mpsc::UnboundedSender<Outbound>,
    transport: Arc<dyn SyncTransport>,
    executor: Arc<dyn CodeExecutor>,
    awareness: Mutex<Awareness>,
    language: watch::Sender<Option<String>>,
    output: watch::Sender<Vec<String>>,
    peers: watch::Sender<usize>,
    status: watch::Sender<SyncStatus>,
    detached: AtomicBool,
    next_binding: AtomicU64,
    publisher: Mutex<Option<JoinHandle<()>>>,
    actor: Mutex<Option<JoinHandle<()>>>,
}

/// Publishes frames in the order they were produced. Failures only mean the
/// transport is down; the handshake after reconnecting fills the gap.
async fn publish_loop(
    transport: Arc<dyn SyncTransport>,
    topic: String,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
) {
    while let Some(Outbound::Frame(frame)) = outbound.recv().await {
        if let Err(e) = transport.publish(&topic, frame).await {
            debug!("Dropped sync frame for {}: {}", topic, e);
        }
    }
}

/// Caller side of an attached document.
#[derive(Clone)]
pub struct SyncHandle {
    inner: Arc<SyncInner>,
}

impl SyncHandle {
    pub fn room(&self) -> &RoomId {
        &self.inner.room
    }

    pub fn replica_id(&self) -> ReplicaId {
        self.inner.replica
    }

    pub fn is_detached(&self) -> bool {
        self.inner.detached.load(Ordering::SeqCst)
    }

    /// Current shared text; empty once detached.
    pub fn text(&self) -> String {
        self.inner
            .state
            .lock()
            .doc
            .as_ref()
            .map(|doc| doc.text())
            .unwrap_or_default()
    }

    pub fn language(&self) -> Option<String> {
        self.inner.language.borrow().clone()
    }

    pub fn watch_language(&self) -> watch::Receiver<Option<String>> {
        self.inner.language.subscribe()
    }

    pub fn output(&self) -> Vec<String> {
        self.inner.output.borrow().clone()
    }

    pub fn watch_output(&self) -> watch::Receiver<Vec<String>> {
        self.inner.output.subscribe()
    }

    /// Number of other participants currently present.
    pub fn peer_count(&self) -> usize {
        *self.inner.peers.borrow()
    }

    pub fn watch_peers(&self) -> watch::Receiver<usize> {
        self.inner.peers.subscribe()
    }

    pub fn status(&self) -> SyncStatus {
        *self.inner.status.borrow()
    }

    pub fn watch_status(&self) -> watch::Receiver<SyncStatus> {
        self.inner.status.subscribe()
    }

    pub fn local_presence(&self) -> PresenceState {
        self.inner.awareness.lock().local().clone()
    }

    pub fn peers(&self) -> Vec<PresenceState> {
        self.inner.awareness.lock().peers()
    }

    /// Links a view buffer to the shared text. The buffer is overwritten with
    /// the current text; a previous binding is released.
    pub fn bind_editor<B: TextBuffer>(&self, buffer: B) -> Result<EditorBinding, SyncError> {
        let id = self.inner.next_binding.fetch_add(1, Ordering::SeqCst);

        let mut state = self.inner.state.lock();
        let text = state.doc.as_ref().ok_or(SyncError::Detached)?.text();

        if state.binding.take().is_some() {
            debug!("Replacing editor binding in room {}", self.inner.room);
        }

        let mut buffer: Box<dyn TextBuffer> = Box::new(buffer);
        let current = buffer.text().chars().count();
        buffer.apply_splice(&TextSplice {
            index: 0,
            delete: current,
            insert: text,
        });
        buffer.attach_route(EditRoute {
            id,
            inner: Arc::downgrade(&self.inner),
        });

        state.binding = Some(BoundBuffer { id, buffer });

        Ok(EditorBinding {
            id,
            inner: Arc::downgrade(&self.inner),
        })
    }

    /// Assigns the shared language; every participant observes the change.
    pub fn set_language(&self, language: impl Into<String>) -> Result<(), SyncError> {
        self.inner.apply_local(LocalOp::Assign {
            register: LANGUAGE_REGISTER.to_owned(),
            value: language.into(),
        })
    }

    pub fn append_output(&self, line: impl Into<String>) -> Result<(), SyncError> {
        self.inner.apply_local(LocalOp::AppendOutput(line.into()))
    }

    /// Runs `source` and replaces the shared output log with the result in a
    /// single update. Execution failures end up in the log, not in the
    /// returned error.
    pub async fn run_and_publish(&self, source: &str, language: &str) -> Result<Vec<String>, SyncError> {
        if self.is_detached() {
            return Err(SyncError::Detached);
        }
        info!("Running {} snippet in room {}", language, self.inner.room);

        let request = ExecutionRequest::new(language, source);
        let lines = output_lines(self.inner.executor.execute(&request).await);

        self.inner
            .apply_local(LocalOp::ReplaceOutput(lines.clone()))?;
        Ok(lines)
    }

    /// Leaves the room's document and drops the local replica. Safe to call
    /// any number of times.
    pub async fn detach(&self) {
        let inner = &self.inner;
        if inner.detached.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Detaching replica {} from room {}", inner.replica, inner.room);

        if let Some(actor) = inner.actor.lock().take() {
            actor.abort();
        }

        {
            let mut state = inner.state.lock();
            state.binding = None;
            state.doc = None;
        }

        let goodbye = inner.awareness.lock().goodbye();
        inner.broadcast(SyncPacket::Awareness(goodbye));
        let _ = inner.outbound.send(Outbound::Close);

        let publisher = inner.publisher.lock().take();
        if let Some(publisher) = publisher
            && tokio::time::timeout(Duration::from_secs(1), publisher)
                .await
                .is_err()
        {
            debug!("Publisher of room {} did not drain in time", inner.room);
        }

        inner.transport.leave(&inner.topic).await;
        inner.peers.send_replace(0);
        inner.status.send_replace(SyncStatus::Offline);
    }
}

impl SyncInner {
    fn encode(&self, envelope: &SyncEnvelope) -> Option<Vec<u8>> {
        match envelope.encode() {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("Failed to encode sync envelope: {}", e);
                None
            }
        }
    }

    pub(crate) fn broadcast(&self, packet: SyncPacket) {
        if let Some(frame) = self.encode(&SyncEnvelope::broadcast(self.replica, packet)) {
            let _ = self.outbound.send(Outbound::Frame(frame));
        }
    }

    pub(crate) fn send_to(&self, to: ReplicaId, packet: SyncPacket) {
        if let Some(frame) = self.encode(&SyncEnvelope::direct(self.replica, to, packet)) {
            let _ = self.outbound.send(Outbound::Frame(frame));
        }
    }
}
