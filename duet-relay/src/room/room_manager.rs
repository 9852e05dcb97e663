use crate::room::{Room, RoomCommand};
use crate::signaling::SignalingOutput;
use dashmap::DashMap;
use duet_core::RoomId;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendError;
use tracing::{info, warn};

/// Routes commands to per-room actors, spawning a room on first use and
/// forgetting it once it has emptied.
#[derive(Clone)]
pub struct RoomManager {
    rooms: Arc<DashMap<RoomId, mpsc::Sender<RoomCommand>>>,
    signaling: Arc<dyn SignalingOutput>,
    capacity: usize,
    channel_capacity: usize,
}

impl RoomManager {
    pub fn new(signaling: Arc<dyn SignalingOutput>, capacity: usize, channel_capacity: usize) -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
            signaling,
            capacity,
            channel_capacity: channel_capacity.max(1),
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn contains(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub fn get_room_sender(&self, room_id: &RoomId) -> mpsc::Sender<RoomCommand> {
        self.rooms
            .entry(room_id.clone())
            .or_insert_with(|| self.spawn_room(room_id.clone()))
            .clone()
    }

    /// Delivers a command, retrying once on a fresh room if the current one
    /// retired between lookup and send.
    pub async fn dispatch(&self, room_id: &RoomId, cmd: RoomCommand) {
        let mut cmd = cmd;
        for _ in 0..2 {
            let tx = self.get_room_sender(room_id);
            match tx.send(cmd).await {
                Ok(()) => return,
                Err(SendError(returned)) => {
                    self.rooms.remove_if(room_id, |_, current| current.same_channel(&tx));
                    cmd = returned;
                }
            }
        }
        warn!(
            "Dropping command for room '{}' from {}",
            room_id,
            cmd.peer_id()
        );
    }

    fn spawn_room(&self, room_id: RoomId) -> mpsc::Sender<RoomCommand> {
        info!("Creating new room: {}", room_id);
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let room = Room::new(room_id.clone(), self.capacity, rx, self.signaling.clone());

        let manager = self.clone();
        let own_tx = tx.clone();
        tokio::spawn(async move {
            let mut rx = room.run().await;

            manager
                .rooms
                .remove_if(&room_id, |_, current| current.same_channel(&own_tx));
            drop(own_tx);
            rx.close();

            // Commands that raced with the last leave belong to a new room.
            while let Ok(cmd) = rx.try_recv() {
                manager.dispatch(&room_id, cmd).await;
            }
            info!("Room '{}' retired", room_id);
        });

        tx
    }
}
