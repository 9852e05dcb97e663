use crate::NegotiationError;
use crate::session::{LinkState, LocalMedia, MediaKind};
use async_trait::async_trait;
use duet_core::{IceCandidate, IceServerConfig, SessionDescription};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use webrtc::track::track_remote::TrackRemote;

/// Media arriving from the remote participant.
#[derive(Clone)]
pub struct RemoteTrack {
    pub id: String,
    pub stream_id: String,
    pub kind: MediaKind,
    /// Readable RTP source, present for WebRTC links.
    pub track: Option<Arc<TrackRemote>>,
}

impl fmt::Debug for RemoteTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTrack")
            .field("id", &self.id)
            .field("stream_id", &self.stream_id)
            .field("kind", &self.kind)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum PeerEvent {
    StateChanged(LinkState),
    LocalCandidate(IceCandidate),
    RemoteTrack(RemoteTrack),
}

/// Where a link reports its events. Every event is tagged with the
/// generation of the link that produced it, so the session can discard
/// callbacks from a connection it already replaced.
#[derive(Debug, Clone)]
pub struct PeerEventSink {
    generation: u64,
    tx: mpsc::UnboundedSender<(u64, PeerEvent)>,
}

impl PeerEventSink {
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<(u64, PeerEvent)>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn emit(&self, event: PeerEvent) {
        let _ = self.tx.send((self.generation, event));
    }
}

/// One peer connection. Methods mirror the offer/answer steps so the
/// session decides their order.
#[async_trait]
pub trait PeerLink: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription, NegotiationError>;

    async fn create_answer(&self) -> Result<SessionDescription, NegotiationError>;

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), NegotiationError>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), NegotiationError>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), NegotiationError>;

    async fn close(&self) -> Result<(), NegotiationError>;
}

/// Builds peer links carrying the local media.
#[async_trait]
pub trait PeerConnector: Send + Sync {
    async fn connect(
        &self,
        ice_servers: &[IceServerConfig],
        media: &LocalMedia,
        events: PeerEventSink,
    ) -> Result<Arc<dyn PeerLink>, NegotiationError>;
}
