use duet_core::doc::ReplicaId;
use duet_core::{AwarenessUpdate, PresenceState};
use rand::Rng;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Ephemeral presence of the participants of one document. Never persisted
/// and rebuilt after every reconnection.
#[derive(Debug)]
pub struct Awareness {
    local: PresenceState,
    clock: u64,
    remote: HashMap<ReplicaId, RemotePresence>,
}

#[derive(Debug)]
struct RemotePresence {
    clock: u64,
    state: Option<PresenceState>,
    seen: Instant,
}

impl Awareness {
    pub fn new(local: PresenceState) -> Self {
        Self {
            local,
            clock: 0,
            remote: HashMap::new(),
        }
    }

    /// `User-<n>` with a random color.
    pub fn random_presence() -> PresenceState {
        let mut rng = rand::thread_rng();
        PresenceState {
            label: format!("User-{}", rng.gen_range(0..1000)),
            color: format!("#{:06x}", rng.gen_range(0..=0xff_ffff)),
        }
    }

    pub fn local(&self) -> &PresenceState {
        &self.local
    }

    /// Next announcement of the local state.
    pub fn local_update(&mut self) -> AwarenessUpdate {
        self.clock += 1;
        AwarenessUpdate {
            clock: self.clock,
            state: Some(self.local.clone()),
        }
    }

    /// Announcement that the local participant is gone.
    pub fn goodbye(&mut self) -> AwarenessUpdate {
        self.clock += 1;
        AwarenessUpdate {
            clock: self.clock,
            state: None,
        }
    }

    /// Returns whether the peer count changed. Updates older than the last
    /// one seen from `from` are ignored.
    pub fn apply(&mut self, from: ReplicaId, update: AwarenessUpdate, now: Instant) -> bool {
        let before = self.peer_count();
        match self.remote.get_mut(&from) {
            Some(known) if update.clock < known.clock => return false,
            Some(known) => {
                known.clock = update.clock;
                known.state = update.state;
                known.seen = now;
            }
            None => {
                self.remote.insert(
                    from,
                    RemotePresence {
                        clock: update.clock,
                        state: update.state,
                        seen: now,
                    },
                );
            }
        }
        before != self.peer_count()
    }

    /// Forgets peers that have been silent for longer than `timeout`.
    pub fn expire(&mut self, now: Instant, timeout: Duration) -> bool {
        let before = self.peer_count();
        self.remote
            .retain(|_, p| now.saturating_duration_since(p.seen) <= timeout);
        before != self.peer_count()
    }

    pub fn clear_remote(&mut self) -> bool {
        let before = self.peer_count();
        self.remote.clear();
        before != 0
    }

    pub fn peer_count(&self) -> usize {
        self.remote.values().filter(|p| p.state.is_some()).count()
    }

    pub fn peers(&self) -> Vec<PresenceState> {
        self.remote.values().filter_map(|p| p.state.clone()).collect()
    }
}
