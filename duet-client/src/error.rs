use crate::session::MediaKind;
use duet_core::CodecError;
use duet_core::doc::DocumentError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaAccessError {
    #[error("permission to capture camera/microphone was denied")]
    PermissionDenied,

    #[error("no {kind} capture device available")]
    NoDevice { kind: MediaKind },
}

#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("invalid session description: {0}")]
    Sdp(String),

    #[error("failed to apply candidate: {0}")]
    Candidate(String),

    #[error("peer connection is closed")]
    Closed,

    #[error("WebRTC error: {0}")]
    Rtc(#[from] webrtc::Error),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to relay: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("relay connection is closed")]
    Closed,

    #[error("transport is offline")]
    Offline,

    #[error("failed to encode frame: {0}")]
    Codec(#[from] CodecError),

    #[error("invalid signaling message: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("execution request failed: {0}")]
    Http(reqwest::Error),

    #[error("execution service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("{0}")]
    Service(String),

    #[error("execution timed out")]
    Timeout,
}

impl From<reqwest::Error> for ExecutionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ExecutionError::Timeout
        } else {
            ExecutionError::Http(e)
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("document is detached")]
    Detached,

    #[error("editor binding was released")]
    Released,

    #[error(transparent)]
    Document(#[from] DocumentError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid client config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Media(#[from] MediaAccessError),

    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
