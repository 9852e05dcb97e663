use crate::NegotiationError;
use crate::session::{
    LinkState, LocalMedia, MediaKind, PeerConnector, PeerEvent, PeerEventSink, PeerLink,
    RemoteTrack,
};
use async_trait::async_trait;
use duet_core::{IceCandidate, IceServerConfig, SdpKind, SessionDescription};
use std::sync::Arc;
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

/// Builds [`RtcPeerLink`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct RtcPeerConnector;

#[async_trait]
impl PeerConnector for RtcPeerConnector {
    async fn connect(
        &self,
        ice_servers: &[IceServerConfig],
        media: &LocalMedia,
        events: PeerEventSink,
    ) -> Result<Arc<dyn PeerLink>, NegotiationError> {
        let link = RtcPeerLink::new(ice_servers, media, events).await?;
        Ok(Arc::new(link))
    }
}

/// WebRTC peer connection carrying the local tracks.
pub struct RtcPeerLink {
    peer_connection: Arc<RTCPeerConnection>,
}

impl RtcPeerLink {
    pub async fn new(
        ice_servers: &[IceServerConfig],
        media: &LocalMedia,
        events: PeerEventSink,
    ) -> Result<Self, NegotiationError> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: ice_servers.iter().map(to_rtc_ice_server).collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        for track in media.tracks() {
            if let Some(rtp) = track.rtp_track() {
                peer_connection
                    .add_track(rtp as Arc<dyn TrackLocal + Send + Sync>)
                    .await?;
                debug!("Added local {} track {}", track.kind(), track.id());
            }
        }

        let generation = events.generation();

        let state_events = events.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let events = state_events.clone();
                Box::pin(async move {
                    info!("Peer connection #{} state changed: {}", generation, s);
                    let state = match s {
                        RTCPeerConnectionState::New => LinkState::New,
                        RTCPeerConnectionState::Connecting => LinkState::Connecting,
                        RTCPeerConnectionState::Connected => LinkState::Connected,
                        RTCPeerConnectionState::Disconnected => LinkState::Disconnected,
                        RTCPeerConnectionState::Failed => LinkState::Failed,
                        RTCPeerConnectionState::Closed => LinkState::Closed,
                        RTCPeerConnectionState::Unspecified => return,
                    };
                    events.emit(PeerEvent::StateChanged(state));
                })
            },
        ));

        let ice_events = events.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let events = ice_events.clone();
            Box::pin(async move {
                let Some(candidate) = c else { return };
                let init = match candidate.to_json() {
                    Ok(init) => init,
                    Err(e) => {
                        warn!("Failed to serialize local candidate: {}", e);
                        return;
                    }
                };
                events.emit(PeerEvent::LocalCandidate(IceCandidate {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_m_line_index: init.sdp_mline_index,
                    username_fragment: init.username_fragment,
                }));
            })
        }));

        let track_events = events;
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let events = track_events.clone();
                Box::pin(async move {
                    let kind = match track.kind() {
                        RTPCodecType::Audio => MediaKind::Audio,
                        RTPCodecType::Video => MediaKind::Video,
                        _ => return,
                    };
                    info!("Remote {} track {} arrived", kind, track.id());
                    events.emit(PeerEvent::RemoteTrack(RemoteTrack {
                        id: track.id(),
                        stream_id: track.stream_id(),
                        kind,
                        track: Some(track),
                    }));
                })
            },
        ));

        Ok(Self { peer_connection })
    }

    pub fn peer_connection(&self) -> &Arc<RTCPeerConnection> {
        &self.peer_connection
    }
}

#[async_trait]
impl PeerLink for RtcPeerLink {
    async fn create_offer(&self) -> Result<SessionDescription, NegotiationError> {
        let offer = self.peer_connection.create_offer(None).await?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription, NegotiationError> {
        let answer = self.peer_connection.create_answer(None).await?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), NegotiationError> {
        self.peer_connection
            .set_local_description(to_rtc_description(desc)?)
            .await?;
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), NegotiationError> {
        self.peer_connection
            .set_remote_description(to_rtc_description(desc)?)
            .await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), NegotiationError> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: candidate.username_fragment,
        };
        self.peer_connection
            .add_ice_candidate(init)
            .await
            .map_err(|e| NegotiationError::Candidate(e.to_string()))
    }

    async fn close(&self) -> Result<(), NegotiationError> {
        self.peer_connection.close().await?;
        Ok(())
    }
}

fn to_rtc_ice_server(server: &IceServerConfig) -> RTCIceServer {
    RTCIceServer {
        urls: server.urls.clone(),
        username: server.username.clone().unwrap_or_default(),
        credential: server.credential.clone().unwrap_or_default(),
    }
}

fn to_rtc_description(desc: SessionDescription) -> Result<RTCSessionDescription, NegotiationError> {
    let parsed = match desc.kind {
        SdpKind::Offer => RTCSessionDescription::offer(desc.sdp),
        SdpKind::Answer => RTCSessionDescription::answer(desc.sdp),
    };
    parsed.map_err(|e| NegotiationError::Sdp(e.to_string()))
}
