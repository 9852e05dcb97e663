use crate::NegotiationError;
use crate::session::engine::SessionActor;
use crate::session::{LinkState, PeerEvent, PeerEventSink, SessionState};
use duet_core::SignalMessage;
use tracing::{debug, info, warn};

impl SessionActor {
    /// Creates the peer connection for the next negotiation. Events of
    /// earlier connections are ignored from here on.
    pub(super) async fn prepare_link(&mut self) {
        self.generation += 1;
        let sink = PeerEventSink::new(self.generation, self.peer_events_tx.clone());

        match self
            .connector
            .connect(&self.ice_servers, &self.media, sink)
            .await
        {
            Ok(link) => {
                debug!("Prepared peer connection #{}", self.generation);
                self.link = Some(link);
                self.link_fresh = true;
            }
            Err(e) => {
                self.link = None;
                self.link_fresh = false;
                self.fail(e);
            }
        }
    }

    pub(super) async fn close_link(&mut self) {
        self.generation += 1;
        self.candidates.reset();
        self.tracks_tx.send_replace(Vec::new());
        if let Some(link) = self.link.take()
            && let Err(e) = link.close().await
        {
            warn!("Failed to close peer connection: {}", e);
        }
    }

    pub(super) async fn reset_link(&mut self) {
        self.close_link().await;
        self.prepare_link().await;
    }

    pub(super) async fn handle_peer_event(&mut self, generation: u64, event: PeerEvent) {
        if generation != self.generation {
            debug!("Dropping event of retired peer connection #{}", generation);
            return;
        }

        match event {
            PeerEvent::LocalCandidate(candidate) => {
                self.send_signal(SignalMessage::Candidate {
                    room: self.room.clone(),
                    candidate,
                })
                .await;
            }

            PeerEvent::StateChanged(state) => match state {
                LinkState::Connected => self.set_state(SessionState::Connected),
                LinkState::Disconnected | LinkState::Closed => {
                    self.set_state(SessionState::Disconnected)
                }
                LinkState::Failed => self.set_state(SessionState::Failed),
                LinkState::New | LinkState::Connecting => {}
            },

            PeerEvent::RemoteTrack(track) => {
                info!("Remote {} track {} attached", track.kind, track.id);
                self.tracks_tx.send_modify(|tracks| tracks.push(track));
            }
        }
    }

    pub(super) fn set_state(&self, state: SessionState) {
        let changed = self.state_tx.send_if_modified(|current| {
            if *current == state || current.is_closed() {
                return false;
            }
            *current = state;
            true
        });
        if changed {
            info!("Session in room {} is now {}", self.room, state);
        }
    }

    /// Negotiation failures are reported through the state, never by
    /// tearing the session down.
    pub(super) fn fail(&self, error: NegotiationError) {
        warn!("Negotiation in room {} failed: {}", self.room, error);
        self.set_state(SessionState::Failed);
    }
}
