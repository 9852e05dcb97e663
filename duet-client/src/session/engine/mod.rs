//! Session negotiation: one actor per joined room owns the peer link, the
//! candidate buffer and the observable state. The handle talks to it over a
//! command channel; media toggles act on the local tracks directly.

use crate::MediaAccessError;
use crate::config::{ClientConfig, MediaConstraints};
use crate::relay::{ListenerId, Signaling};
use crate::session::{
    CandidateQueue, LocalMedia, MediaDevices, MediaKind, PeerConnector, PeerEvent, PeerLink,
    RemoteTrack, SessionState,
};
use duet_core::{IceServerConfig, PeerId, RoomId, SignalMessage};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{info, warn};

mod handle_signal_impl;
mod link_impl;
mod negotiation_impl;
mod teardown_impl;

/// Entry point of media sessions.
pub struct SessionEngine {
    signaling: Arc<dyn Signaling>,
    connector: Arc<dyn PeerConnector>,
    devices: Arc<dyn MediaDevices>,
    constraints: MediaConstraints,
    ice_servers: Vec<IceServerConfig>,
}

impl SessionEngine {
    pub fn new(
        signaling: Arc<dyn Signaling>,
        connector: Arc<dyn PeerConnector>,
        devices: Arc<dyn MediaDevices>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            signaling,
            connector,
            devices,
            constraints: config.media.clone(),
            ice_servers: config.ice_servers.clone(),
        }
    }

    /// Captures local media, announces presence in `room` and starts
    /// negotiating. If capture is refused nothing else happens; if the relay
    /// cannot be reached the session moves to `Failed`.
    pub async fn join(&self, room: RoomId) -> Result<SessionHandle, MediaAccessError> {
        let media = match self.devices.open(&self.constraints).await {
            Ok(media) => Arc::new(media),
            Err(e) => {
                warn!("Cannot join room {}: {}", room, e);
                return Err(e);
            }
        };

        let listener = self.signaling.listen();
        let ice_servers = self
            .signaling
            .ice_servers()
            .unwrap_or_else(|| self.ice_servers.clone());

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SessionState::New);
        let (tracks_tx, tracks_rx) = watch::channel(Vec::new());
        let (peer_events_tx, peer_events_rx) = mpsc::unbounded_channel();

        let actor = SessionActor {
            room: room.clone(),
            signaling: self.signaling.clone(),
            connector: self.connector.clone(),
            media: media.clone(),
            ice_servers,
            link: None,
            link_fresh: false,
            generation: 0,
            candidates: CandidateQueue::new(),
            remote_peer: None,
            listener_id: listener.id,
            signals: listener.rx,
            signals_open: true,
            commands: command_rx,
            peer_events_tx,
            peer_events: peer_events_rx,
            state_tx,
            tracks_tx,
        };

        info!("Joining room {}", room);
        tokio::spawn(actor.run());

        Ok(SessionHandle {
            room,
            media,
            commands: command_tx,
            state: state_rx,
            remote_tracks: tracks_rx,
        })
    }
}

enum SessionCommand {
    Leave { done: oneshot::Sender<()> },
}

/// Caller side of a joined session. Dropping every clone leaves the room.
#[derive(Clone)]
pub struct SessionHandle {
    room: RoomId,
    media: Arc<LocalMedia>,
    commands: mpsc::UnboundedSender<SessionCommand>,
    state: watch::Receiver<SessionState>,
    remote_tracks: watch::Receiver<Vec<RemoteTrack>>,
}

impl SessionHandle {
    pub fn room(&self) -> &RoomId {
        &self.room
    }

    pub fn local_media(&self) -> &LocalMedia {
        &self.media
    }

    /// Flips the local audio tracks. No renegotiation takes place.
    pub fn toggle_audio(&self) -> Option<bool> {
        self.media.toggle(MediaKind::Audio)
    }

    pub fn toggle_video(&self) -> Option<bool> {
        self.media.toggle(MediaKind::Video)
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    pub fn remote_tracks(&self) -> Vec<RemoteTrack> {
        self.remote_tracks.borrow().clone()
    }

    pub fn watch_remote_tracks(&self) -> watch::Receiver<Vec<RemoteTrack>> {
        self.remote_tracks.clone()
    }

    /// Stops local tracks, closes the peer connection and leaves the room.
    /// Safe to call any number of times.
    pub async fn leave(&self) {
        let (done, finished) = oneshot::channel();
        if self.commands.send(SessionCommand::Leave { done }).is_ok() {
            let _ = finished.await;
        }
    }
}

pub(super) struct SessionActor {
    room: RoomId,
    signaling: Arc<dyn Signaling>,
    connector: Arc<dyn PeerConnector>,
    media: Arc<LocalMedia>,
    ice_servers: Vec<IceServerConfig>,
    link: Option<Arc<dyn PeerLink>>,
    /// No description has been applied to the current link yet.
    link_fresh: bool,
    generation: u64,
    candidates: CandidateQueue,
    remote_peer: Option<PeerId>,
    listener_id: ListenerId,
    signals: mpsc::UnboundedReceiver<SignalMessage>,
    signals_open: bool,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    peer_events_tx: mpsc::UnboundedSender<(u64, PeerEvent)>,
    peer_events: mpsc::UnboundedReceiver<(u64, PeerEvent)>,
    state_tx: watch::Sender<SessionState>,
    tracks_tx: watch::Sender<Vec<RemoteTrack>>,
}

impl SessionActor {
    async fn run(mut self) {
        self.prepare_link().await;

        if let Err(e) = self
            .signaling
            .send(SignalMessage::Join {
                room: self.room.clone(),
            })
            .await
        {
            warn!("Failed to announce join of room {}: {}", self.room, e);
            self.set_state(SessionState::Failed);
        }

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(SessionCommand::Leave { done }) => {
                            self.teardown().await;
                            let _ = done.send(());
                        }
                        None => self.teardown().await,
                    }
                    break;
                }
                signal = self.signals.recv(), if self.signals_open => match signal {
                    Some(message) => self.handle_signal(message).await,
                    None => {
                        warn!("Signaling for room {} closed", self.room);
                        self.signals_open = false;
                    }
                },
                Some((generation, event)) = self.peer_events.recv() => {
                    self.handle_peer_event(generation, event).await;
                }
            }
        }

        info!("Session for room {} finished", self.room);
    }
}
