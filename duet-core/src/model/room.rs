use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::utils::SYNC_TOPIC_PREFIX;

/// Opaque, caller-supplied room identifier.
///
/// A room is the unit of isolation for both engines: media signaling is scoped
/// by the identifier itself, document sync by [`RoomId::sync_topic`].
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random identifier, for callers that create rooms on demand.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn sync_topic(&self) -> String {
        format!("{}{}", SYNC_TOPIC_PREFIX, self.0)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
