use crate::session::SessionState;
use crate::session::engine::SessionActor;
use duet_core::SignalMessage;
use tracing::info;

impl SessionActor {
    /// Releases everything the session holds. Works from any state,
    /// including before the first negotiation step.
    pub(super) async fn teardown(&mut self) {
        info!("Leaving room {}", self.room);

        self.media.stop_all();
        self.close_link().await;

        if self.signals_open {
            self.send_signal(SignalMessage::Leave {
                room: self.room.clone(),
            })
            .await;
        }
        self.signaling.unlisten(self.listener_id);
        self.signals_open = false;
        self.remote_peer = None;

        self.set_state(SessionState::Closed);
    }
}
