use crate::NegotiationError;
use crate::session::SessionState;
use crate::session::engine::SessionActor;
use duet_core::{IceCandidate, PeerId, SdpKind, SessionDescription, SignalMessage};
use tracing::{debug, info, warn};

impl SessionActor {
    /// The peer that was already present initiates: it offers to whoever
    /// joins after it.
    pub(super) async fn handle_peer_joined(&mut self, peer_id: PeerId) {
        self.remote_peer = Some(peer_id);
        if !self.link_fresh {
            self.reset_link().await;
        }
        if let Err(e) = self.send_offer().await {
            self.fail(e);
        }
    }

    async fn send_offer(&mut self) -> Result<(), NegotiationError> {
        let link = self.link.clone().ok_or(NegotiationError::Closed)?;
        self.link_fresh = false;

        let offer = link.create_offer().await?;
        link.set_local_description(offer.clone()).await?;
        self.set_state(SessionState::HaveLocalOffer);

        info!("Sending offer to room {}", self.room);
        self.send_signal(SignalMessage::Offer {
            room: self.room.clone(),
            description: offer,
        })
        .await;
        Ok(())
    }

    pub(super) async fn handle_offer(&mut self, offer: SessionDescription) {
        if offer.kind != SdpKind::Offer {
            self.fail(NegotiationError::Sdp("expected an offer".to_owned()));
            return;
        }
        if !self.link_fresh {
            debug!("Offer on a used connection, starting over");
            self.reset_link().await;
        }
        if let Err(e) = self.answer_offer(offer).await {
            self.fail(e);
        }
    }

    async fn answer_offer(&mut self, offer: SessionDescription) -> Result<(), NegotiationError> {
        let link = self.link.clone().ok_or(NegotiationError::Closed)?;
        self.link_fresh = false;

        link.set_remote_description(offer).await?;
        self.set_state(SessionState::HaveRemoteOffer);

        let answer = link.create_answer().await?;
        link.set_local_description(answer.clone()).await?;

        info!("Sending answer to room {}", self.room);
        self.send_signal(SignalMessage::Answer {
            room: self.room.clone(),
            description: answer,
        })
        .await;

        self.flush_candidates().await;
        Ok(())
    }

    pub(super) async fn handle_answer(&mut self, answer: SessionDescription) {
        if answer.kind != SdpKind::Answer {
            self.fail(NegotiationError::Sdp("expected an answer".to_owned()));
            return;
        }
        if *self.state_tx.borrow() != SessionState::HaveLocalOffer {
            warn!("Ignoring answer without a pending offer in room {}", self.room);
            return;
        }
        let Some(link) = self.link.clone() else {
            self.fail(NegotiationError::Closed);
            return;
        };
        if let Err(e) = link.set_remote_description(answer).await {
            self.fail(e);
            return;
        }
        self.flush_candidates().await;
    }

    /// Applies a remote candidate, or buffers it until the remote
    /// description is in place.
    pub(super) async fn handle_candidate(&mut self, candidate: IceCandidate) {
        match self.candidates.push(candidate) {
            Some(candidate) => self.apply_candidate(candidate).await,
            None => debug!(
                "Buffered remote candidate ({} pending)",
                self.candidates.len()
            ),
        }
    }

    async fn flush_candidates(&mut self) {
        let pending = self.candidates.mark_remote_ready();
        if !pending.is_empty() {
            debug!("Flushing {} buffered candidates", pending.len());
        }
        for candidate in pending {
            self.apply_candidate(candidate).await;
        }
    }

    /// A bad candidate costs one path, not the session.
    async fn apply_candidate(&self, candidate: IceCandidate) {
        let Some(link) = &self.link else {
            return;
        };
        if let Err(e) = link.add_ice_candidate(candidate).await {
            warn!("Failed to apply remote candidate: {}", e);
        }
    }

    pub(super) async fn send_signal(&self, message: SignalMessage) {
        if let Err(e) = self.signaling.send(message).await {
            warn!("Failed to send signal to room {}: {}", self.room, e);
        }
    }
}
