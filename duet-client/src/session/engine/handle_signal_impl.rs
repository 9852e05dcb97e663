use crate::session::SessionState;
use crate::session::engine::SessionActor;
use duet_core::SignalMessage;
use tracing::{debug, info, warn};

impl SessionActor {
    pub(super) async fn handle_signal(&mut self, message: SignalMessage) {
        if let Some(room) = message.room()
            && *room != self.room
        {
            return;
        }

        match message {
            SignalMessage::IceConfig { ice_servers } => {
                info!("Received ICE config: {} servers", ice_servers.len());
                self.ice_servers = ice_servers;
            }

            SignalMessage::PeerJoined { peer_id, .. } => {
                info!("Peer {} joined room {}", peer_id, self.room);
                self.handle_peer_joined(peer_id).await;
            }

            SignalMessage::Offer { description, .. } => {
                info!("Received offer in room {}", self.room);
                self.handle_offer(description).await;
            }

            SignalMessage::Answer { description, .. } => {
                info!("Received answer in room {}", self.room);
                self.handle_answer(description).await;
            }

            SignalMessage::Candidate { candidate, .. } => {
                self.handle_candidate(candidate).await;
            }

            SignalMessage::PeerLeft { peer_id, .. } => {
                if self.remote_peer.as_ref().is_some_and(|p| *p != peer_id) {
                    debug!("Ignoring departure of unknown peer {}", peer_id);
                    return;
                }
                info!("Peer {} left room {}", peer_id, self.room);
                self.remote_peer = None;
                self.reset_link().await;
                self.set_state(SessionState::Disconnected);
            }

            SignalMessage::RoomFull { .. } => {
                warn!("Room {} is full", self.room);
                self.set_state(SessionState::Failed);
            }

            SignalMessage::Error { message } => {
                warn!("Relay reported an error: {}", message);
            }

            _ => {}
        }
    }
}
