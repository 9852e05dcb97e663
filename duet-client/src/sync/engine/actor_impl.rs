use crate::config::SyncConfig;
use crate::sync::TransportEvent;
use crate::sync::engine::{SyncInner, SyncStatus};
use duet_core::utils::LANGUAGE_REGISTER;
use duet_core::{SyncEnvelope, SyncPacket};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Inbound side of an attached document: transport events, presence
/// heartbeat and the one-shot seeding of defaults.
pub(super) struct SyncActor {
    inner: Weak<SyncInner>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    config: SyncConfig,
    connected: bool,
    seeded: bool,
    settle_at: Option<Instant>,
}

impl SyncActor {
    pub(super) fn new(
        inner: Weak<SyncInner>,
        events: mpsc::UnboundedReceiver<TransportEvent>,
        config: SyncConfig,
        settle_at: Instant,
    ) -> Self {
        Self {
            inner,
            events,
            config,
            connected: false,
            seeded: false,
            settle_at: Some(settle_at),
        }
    }

    pub(super) async fn run(mut self) {
        let period = self.config.heartbeat();
        let mut heartbeat = tokio::time::interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let settle_at = self.settle_at;
            tokio::select! {
                event = self.events.recv() => {
                    let Some(inner) = self.upgrade() else { break };
                    match event {
                        Some(TransportEvent::Connected) => self.on_connected(&inner),
                        Some(TransportEvent::Disconnected) => self.on_disconnected(&inner),
                        Some(TransportEvent::Message(frame)) => self.on_frame(&inner, &frame),
                        None => {
                            info!("Sync transport for room {} closed", inner.room);
                            inner.status.send_replace(SyncStatus::Offline);
                            break;
                        }
                    }
                }
                _ = heartbeat.tick() => {
                    let Some(inner) = self.upgrade() else { break };
                    self.on_heartbeat(&inner);
                }
                _ = tokio::time::sleep_until(settle_at.unwrap_or_else(Instant::now)), if settle_at.is_some() => {
                    let Some(inner) = self.upgrade() else { break };
                    self.on_settled(&inner);
                }
            }
        }
    }

    fn upgrade(&self) -> Option<Arc<SyncInner>> {
        self.inner
            .upgrade()
            .filter(|inner| !inner.detached.load(Ordering::SeqCst))
    }

    fn on_connected(&mut self, inner: &SyncInner) {
        debug!("Sync transport for room {} connected", inner.room);
        self.connected = true;
        inner.status.send_replace(SyncStatus::Connecting);
        self.settle_at = Some(Instant::now() + self.config.seed_grace());

        let state_vector = {
            let state = inner.state.lock();
            state.doc.as_ref().map(|doc| doc.state_vector())
        };
        match state_vector {
            Some(Ok(state_vector)) => inner.broadcast(SyncPacket::Hello { state_vector }),
            Some(Err(e)) => warn!("Failed to encode state vector: {}", e),
            None => return,
        }
        let presence = inner.awareness.lock().local_update();
        inner.broadcast(SyncPacket::Awareness(presence));
    }

    fn on_disconnected(&mut self, inner: &SyncInner) {
        info!("Sync transport for room {} is offline", inner.room);
        self.connected = false;
        inner.status.send_replace(SyncStatus::Offline);
        if inner.awareness.lock().clear_remote() {
            inner.peers.send_replace(0);
        }
    }

    fn on_frame(&mut self, inner: &SyncInner, frame: &[u8]) {
        let envelope = match SyncEnvelope::decode(frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Invalid sync frame in room {}: {}", inner.room, e);
                return;
            }
        };
        if !envelope.is_for(inner.replica) {
            return;
        }
        let from = envelope.from;

        match envelope.packet {
            SyncPacket::Hello { state_vector } => {
                debug!("Replica {} said hello", from);
                if let Some(update) = self.diff_for(inner, &state_vector) {
                    inner.send_to(from, SyncPacket::SyncStep2 { update });
                }
                if let Some(Ok(state_vector)) = inner.state.lock().doc.as_ref().map(|d| d.state_vector()) {
                    inner.send_to(from, SyncPacket::SyncStep1 { state_vector });
                }
                let presence = inner.awareness.lock().local_update();
                inner.broadcast(SyncPacket::Awareness(presence));
            }
            SyncPacket::SyncStep1 { state_vector } => {
                if let Some(update) = self.diff_for(inner, &state_vector) {
                    inner.send_to(from, SyncPacket::SyncStep2 { update });
                }
            }
            SyncPacket::SyncStep2 { update } => {
                inner.merge_remote(&update);
                if self.connected {
                    inner.status.send_if_modified(|status| {
                        let changed = *status != SyncStatus::Synced;
                        *status = SyncStatus::Synced;
                        changed
                    });
                }
                self.seed(inner);
            }
            SyncPacket::Update { update } => inner.merge_remote(&update),
            SyncPacket::Awareness(update) => {
                let mut awareness = inner.awareness.lock();
                if awareness.apply(from, update, Instant::now()) {
                    inner.peers.send_replace(awareness.peer_count());
                }
            }
        }
    }

    fn diff_for(&self, inner: &SyncInner, state_vector: &[u8]) -> Option<Vec<u8>> {
        let state = inner.state.lock();
        match state.doc.as_ref()?.diff(state_vector) {
            Ok(update) => Some(update),
            Err(e) => {
                warn!("Cannot answer sync request in room {}: {}", inner.room, e);
                None
            }
        }
    }

    fn on_heartbeat(&mut self, inner: &SyncInner) {
        let mut awareness = inner.awareness.lock();
        if self.connected {
            inner.broadcast(SyncPacket::Awareness(awareness.local_update()));
        }
        if awareness.expire(Instant::now(), self.config.presence_timeout()) {
            inner.peers.send_replace(awareness.peer_count());
        }
    }

    fn on_settled(&mut self, inner: &SyncInner) {
        self.settle_at = None;
        if self.connected {
            inner.status.send_if_modified(|status| {
                let changed = *status == SyncStatus::Connecting;
                if changed {
                    *status = SyncStatus::Synced;
                }
                changed
            });
        }
        self.seed(inner);
    }

    /// Sets the default language once, and only if nobody did before us.
    fn seed(&mut self, inner: &SyncInner) {
        if self.seeded {
            return;
        }
        self.seeded = true;

        match inner.assign_if_unset(LANGUAGE_REGISTER, &self.config.default_language) {
            Ok(true) => info!(
                "Seeded language {} for room {}",
                self.config.default_language, inner.room
            ),
            Ok(false) => {}
            Err(e) => warn!("Failed to seed language: {}", e),
        }
    }
}
