use crate::room::room_command::RoomCommand;
use crate::signaling::SignalingOutput;
use duet_core::{PeerId, RoomId, SignalMessage};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Media membership of one room.
///
/// The room is created by the first command addressed to it and stops as
/// soon as it has no members left.
pub struct Room {
    id: RoomId,
    members: Vec<PeerId>,
    capacity: usize,
    command_rx: mpsc::Receiver<RoomCommand>,
    signaling: Arc<dyn SignalingOutput>,
}

impl Room {
    pub fn new(
        id: RoomId,
        capacity: usize,
        command_rx: mpsc::Receiver<RoomCommand>,
        signaling: Arc<dyn SignalingOutput>,
    ) -> Self {
        Self {
            id,
            members: Vec::new(),
            capacity,
            command_rx,
            signaling,
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    /// Runs until the last member leaves or every sender is dropped.
    ///
    /// Returns the command receiver so the owner can retire the room without
    /// losing commands that were queued after the last leave.
    pub async fn run(mut self) -> mpsc::Receiver<RoomCommand> {
        info!("Room '{}' event loop started", self.id);

        loop {
            match self.command_rx.recv().await {
                Some(cmd) => self.handle_command(cmd).await,
                None => {
                    info!("Command channel closed. Shutting down room '{}'.", self.id);
                    break;
                }
            }

            if self.members.is_empty() {
                break;
            }
        }

        info!("Room '{}' event loop finished", self.id);
        self.command_rx
    }

    pub(crate) async fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join { peer_id } => self.join(peer_id).await,
            RoomCommand::Signal { peer_id, message } => self.forward(peer_id, message).await,
            RoomCommand::Leave { peer_id } => self.leave(peer_id).await,
        }
    }

    async fn join(&mut self, peer_id: PeerId) {
        if self.members.contains(&peer_id) {
            debug!("Peer {} already in room '{}'", peer_id, self.id);
            return;
        }

        if self.members.len() >= self.capacity {
            info!("Room '{}' is full, rejecting {}", self.id, peer_id);
            self.signaling
                .send(
                    &peer_id,
                    SignalMessage::RoomFull {
                        room: self.id.clone(),
                    },
                )
                .await;
            return;
        }

        info!("Peer {} joined room '{}'", peer_id, self.id);
        let notice = SignalMessage::PeerJoined {
            room: self.id.clone(),
            peer_id: peer_id.clone(),
        };
        for member in &self.members {
            self.signaling.send(member, notice.clone()).await;
        }
        self.members.push(peer_id);
    }

    async fn forward(&mut self, peer_id: PeerId, message: SignalMessage) {
        if !self.members.contains(&peer_id) {
            warn!(
                "Peer {} is not a member of room '{}', dropping signal",
                peer_id, self.id
            );
            self.signaling
                .send(
                    &peer_id,
                    SignalMessage::Error {
                        message: format!("not a member of room '{}'", self.id),
                    },
                )
                .await;
            return;
        }

        for member in self.members.iter().filter(|m| **m != peer_id) {
            self.signaling.send(member, message.clone()).await;
        }
    }

    async fn leave(&mut self, peer_id: PeerId) {
        let Some(index) = self.members.iter().position(|m| *m == peer_id) else {
            return;
        };
        self.members.remove(index);
        info!("Peer {} left room '{}'", peer_id, self.id);

        let notice = SignalMessage::PeerLeft {
            room: self.id.clone(),
            peer_id,
        };
        for member in &self.members {
            self.signaling.send(member, notice.clone()).await;
        }
    }
}
