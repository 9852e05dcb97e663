use crate::ConfigError;
use duet_core::IceServerConfig;
use duet_core::utils::{DEFAULT_LANGUAGE, default_stun_urls};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// WebSocket endpoint of the relay, e.g. `ws://localhost:4444/ws`.
    pub relay_url: String,
    /// Used until the relay pushes its own list.
    pub ice_servers: Vec<IceServerConfig>,
    pub media: MediaConstraints,
    pub sync: SyncConfig,
    pub executor: ExecutorConfig,
    pub reconnect: ReconnectConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay_url: "ws://localhost:4444/ws".to_owned(),
            ice_servers: vec![IceServerConfig {
                urls: default_stun_urls(),
                username: None,
                credential: None,
            }],
            media: MediaConstraints::default(),
            sync: SyncConfig::default(),
            executor: ExecutorConfig::default(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

/// Capture request. Resolution and frame rate are ideals the device may
/// adapt to, not hard requirements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub max_frame_rate: u32,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
            ideal_width: 1280,
            ideal_height: 720,
            max_frame_rate: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub heartbeat_ms: u64,
    pub presence_timeout_ms: u64,
    /// How long a fresh replica waits for peers before seeding defaults.
    pub seed_grace_ms: u64,
    pub default_language: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            heartbeat_ms: 15_000,
            presence_timeout_ms: 30_000,
            seed_grace_ms: 400,
            default_language: DEFAULT_LANGUAGE.to_owned(),
        }
    }
}

impl SyncConfig {
    pub fn heartbeat(&self) -> Duration {
        Duration::from_millis(self.heartbeat_ms)
    }

    pub fn presence_timeout(&self) -> Duration {
        Duration::from_millis(self.presence_timeout_ms)
    }

    pub fn seed_grace(&self) -> Duration {
        Duration::from_millis(self.seed_grace_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Base URL of a Judge0-compatible service.
    pub endpoint: String,
    pub timeout_ms: u64,
    pub api_key: Option<String>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:2358".to_owned(),
            timeout_ms: 10_000,
            api_key: None,
        }
    }
}

impl ExecutorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Backoff of the relay client between connection attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 250,
            max_delay_ms: 5_000,
        }
    }
}

impl ReconnectConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms.max(self.initial_delay_ms))
    }
}
