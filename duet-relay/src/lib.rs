mod config;
mod error;
pub mod room;
pub mod signaling;
pub mod topic;

pub use config::*;
pub use error::*;
pub use room::*;
pub use signaling::*;
pub use topic::*;

use axum::Router;
use axum::routing::get;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// WebSocket routes of the relay, with permissive CORS for browser clients.
pub fn router(service: SignalingService) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/ws/{peer_id}", get(ws_handler_with_id))
        .layer(cors)
        .with_state(service)
}

/// Bound relay, ready to serve.
pub struct RelayServer {
    listener: TcpListener,
    service: SignalingService,
}

impl RelayServer {
    pub async fn bind(config: RelayConfig) -> Result<Self, RelayError> {
        let listener = TcpListener::bind(config.bind)
            .await
            .map_err(|source| RelayError::Bind {
                addr: config.bind,
                source,
            })?;
        let service = SignalingService::new(&config);
        Ok(Self { listener, service })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, RelayError> {
        self.listener.local_addr().map_err(RelayError::Serve)
    }

    pub fn service(&self) -> &SignalingService {
        &self.service
    }

    pub async fn run(self) -> Result<(), RelayError> {
        self.run_until(std::future::pending()).await
    }

    pub async fn run_until<F>(self, shutdown: F) -> Result<(), RelayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Ok(addr) = self.listener.local_addr() {
            info!("Signaling relay listening on ws://{}/ws", addr);
        }
        axum::serve(self.listener, router(self.service))
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(RelayError::Serve)
    }
}
