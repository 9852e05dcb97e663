use dashmap::DashMap;
use duet_core::PeerId;
use std::collections::HashSet;

/// Pub/sub membership for the document sync transport. Topics have no
/// participant cap and vanish with their last subscriber.
#[derive(Default)]
pub struct TopicRegistry {
    topics: DashMap<String, HashSet<PeerId>>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, peer_id: &PeerId, topic: &str) {
        self.topics
            .entry(topic.to_owned())
            .or_default()
            .insert(peer_id.clone());
    }

    pub fn unsubscribe(&self, peer_id: &PeerId, topic: &str) {
        if let Some(mut subscribers) = self.topics.get_mut(topic) {
            subscribers.remove(peer_id);
        }
        self.topics.remove_if(topic, |_, subscribers| subscribers.is_empty());
    }

    pub fn remove_peer(&self, peer_id: &PeerId) {
        self.topics.retain(|_, subscribers| {
            subscribers.remove(peer_id);
            !subscribers.is_empty()
        });
    }

    /// Subscribers of `topic` other than `except`.
    pub fn audience(&self, topic: &str, except: &PeerId) -> Vec<PeerId> {
        self.topics
            .get(topic)
            .map(|subscribers| {
                subscribers
                    .iter()
                    .filter(|peer| *peer != except)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_subscribed(&self, peer_id: &PeerId, topic: &str) -> bool {
        self.topics
            .get(topic)
            .is_some_and(|subscribers| subscribers.contains(peer_id))
    }

    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }
}
