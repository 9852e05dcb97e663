use crate::RelayError;
use duet_core::IceServerConfig;
use duet_core::utils::default_stun_urls;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub bind: SocketAddr,
    /// Media members admitted per room; further joins get `RoomFull`.
    pub max_media_peers: usize,
    /// Pushed to every client in `IceConfig` right after connect.
    pub ice_servers: Vec<IceServerConfig>,
    pub room_channel_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 4444)),
            max_media_peers: 2,
            ice_servers: vec![IceServerConfig {
                urls: default_stun_urls(),
                username: None,
                credential: None,
            }],
            room_channel_capacity: 100,
        }
    }
}

impl RelayConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, RelayError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, RelayError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RelayError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}
