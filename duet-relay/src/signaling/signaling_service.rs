use crate::config::RelayConfig;
use crate::room::{RoomCommand, RoomManager};
use crate::signaling::SignalingOutput;
use crate::topic::TopicRegistry;
use async_trait::async_trait;
use axum::extract::ws::Message;
use bytes::Bytes;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use duet_core::{IceServerConfig, PeerId, RoomId, SignalMessage, TopicFrame};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

struct SignalingInner {
    peers: DashMap<PeerId, mpsc::UnboundedSender<Message>>,
    memberships: DashMap<PeerId, HashSet<RoomId>>,
    topics: TopicRegistry,
    ice_servers: Vec<IceServerConfig>,
}

impl SignalingInner {
    fn send_signal(&self, peer_id: &PeerId, msg: &SignalMessage) {
        let Some(peer) = self.peers.get(peer_id) else {
            warn!("Attempted to send signal to disconnected peer {}", peer_id);
            return;
        };
        match serde_json::to_string(msg) {
            Ok(json) => {
                if let Err(e) = peer.send(Message::Text(json.into())) {
                    error!("Failed to send WS message to {}: {:?}", peer_id, e);
                }
            }
            Err(e) => error!("Failed to serialize signal message: {}", e),
        }
    }
}

#[async_trait]
impl SignalingOutput for SignalingInner {
    async fn send(&self, peer_id: &PeerId, message: SignalMessage) {
        self.send_signal(peer_id, &message);
    }
}

/// Connected sockets, room routing and topic fan-out of one relay.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
    rooms: RoomManager,
}

impl SignalingService {
    pub fn new(config: &RelayConfig) -> Self {
        let inner = Arc::new(SignalingInner {
            peers: DashMap::new(),
            memberships: DashMap::new(),
            topics: TopicRegistry::new(),
            ice_servers: config.ice_servers.clone(),
        });
        let rooms = RoomManager::new(
            inner.clone(),
            config.max_media_peers,
            config.room_channel_capacity,
        );
        Self { inner, rooms }
    }

    pub fn get_ice_servers(&self) -> Vec<IceServerConfig> {
        self.inner.ice_servers.clone()
    }

    pub fn rooms(&self) -> &RoomManager {
        &self.rooms
    }

    pub fn topics(&self) -> &TopicRegistry {
        &self.inner.topics
    }

    pub fn is_connected(&self, peer_id: &PeerId) -> bool {
        self.inner.peers.contains_key(peer_id)
    }

    pub fn peer_count(&self) -> usize {
        self.inner.peers.len()
    }

    /// Registers a socket. Returns false if the id is already taken.
    pub fn add_peer(&self, peer_id: PeerId, tx: mpsc::UnboundedSender<Message>) -> bool {
        match self.inner.peers.entry(peer_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(tx);
                true
            }
        }
    }

    /// Drops a socket: leaves every room it joined and every topic.
    pub async fn remove_peer(&self, peer_id: &PeerId) {
        self.inner.peers.remove(peer_id);
        self.inner.topics.remove_peer(peer_id);

        let rooms = self
            .inner
            .memberships
            .remove(peer_id)
            .map(|(_, rooms)| rooms)
            .unwrap_or_default();
        for room in rooms {
            self.rooms
                .dispatch(
                    &room,
                    RoomCommand::Leave {
                        peer_id: peer_id.clone(),
                    },
                )
                .await;
        }
    }

    pub fn send_signal(&self, peer_id: &PeerId, msg: SignalMessage) {
        self.inner.send_signal(peer_id, &msg);
    }

    pub async fn handle_signal(&self, peer_id: &PeerId, msg: SignalMessage) {
        match msg {
            SignalMessage::Join { room } => {
                self.inner
                    .memberships
                    .entry(peer_id.clone())
                    .or_default()
                    .insert(room.clone());
                self.rooms
                    .dispatch(
                        &room,
                        RoomCommand::Join {
                            peer_id: peer_id.clone(),
                        },
                    )
                    .await;
            }
            SignalMessage::Leave { room } => {
                if let Some(mut rooms) = self.inner.memberships.get_mut(peer_id) {
                    rooms.remove(&room);
                }
                self.rooms
                    .dispatch(
                        &room,
                        RoomCommand::Leave {
                            peer_id: peer_id.clone(),
                        },
                    )
                    .await;
            }
            SignalMessage::Offer { ref room, .. }
            | SignalMessage::Answer { ref room, .. }
            | SignalMessage::Candidate { ref room, .. } => {
                let room = room.clone();
                self.rooms
                    .dispatch(
                        &room,
                        RoomCommand::Signal {
                            peer_id: peer_id.clone(),
                            message: msg,
                        },
                    )
                    .await;
            }
            SignalMessage::Subscribe { topics } => {
                for topic in &topics {
                    debug!("Peer {} subscribed to '{}'", peer_id, topic);
                    self.inner.topics.subscribe(peer_id, topic);
                }
            }
            SignalMessage::Unsubscribe { topics } => {
                for topic in &topics {
                    self.inner.topics.unsubscribe(peer_id, topic);
                }
            }
            SignalMessage::Ping => self.send_signal(peer_id, SignalMessage::Pong),
            other => {
                warn!("Unexpected message from {}: {:?}", peer_id, other);
                self.send_signal(
                    peer_id,
                    SignalMessage::Error {
                        message: "unexpected message".to_owned(),
                    },
                );
            }
        }
    }

    /// Fans a binary topic frame out to every other subscriber, unchanged.
    pub fn publish(&self, peer_id: &PeerId, data: Bytes) {
        let frame = match TopicFrame::decode(&data) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Malformed topic frame from {}: {}", peer_id, e);
                return;
            }
        };

        let audience = self.inner.topics.audience(&frame.topic, peer_id);
        if audience.is_empty() {
            debug!("No other subscribers on '{}'", frame.topic);
            return;
        }
        for target in audience {
            if let Some(peer) = self.inner.peers.get(&target) {
                let _ = peer.send(Message::Binary(data.clone()));
            }
        }
    }

    pub(crate) fn welcome(&self, peer_id: &PeerId) {
        info!("Greeting peer {}", peer_id);
        self.send_signal(
            peer_id,
            SignalMessage::Welcome {
                peer_id: peer_id.clone(),
            },
        );
        self.send_signal(
            peer_id,
            SignalMessage::IceConfig {
                ice_servers: self.get_ice_servers(),
            },
        );
    }
}
