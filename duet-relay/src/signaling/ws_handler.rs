use crate::SignalingService;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use duet_core::{PeerId, SignalMessage};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// `GET /ws`: the relay assigns the peer id and announces it in `Welcome`.
pub async fn ws_handler(ws: WebSocketUpgrade, State(service): State<SignalingService>) -> Response {
    upgrade(ws, PeerId::new(), service)
}

/// `GET /ws/{peer_id}`: the client brings its own id.
pub async fn ws_handler_with_id(
    ws: WebSocketUpgrade,
    Path(peer_id): Path<String>,
    State(service): State<SignalingService>,
) -> Response {
    match peer_id.parse::<PeerId>() {
        Ok(peer_id) => upgrade(ws, peer_id, service),
        Err(e) => (StatusCode::BAD_REQUEST, format!("invalid peer id: {e}")).into_response(),
    }
}

fn upgrade(ws: WebSocketUpgrade, peer_id: PeerId, service: SignalingService) -> Response {
    if service.is_connected(&peer_id) {
        return (StatusCode::CONFLICT, "peer id already connected").into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(socket, peer_id, service))
}

async fn handle_socket(socket: WebSocket, peer_id: PeerId, service: SignalingService) {
    info!("New WebSocket connection: {}", peer_id);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    if !service.add_peer(peer_id.clone(), tx) {
        warn!("Peer id {} connected twice, closing", peer_id);
        let _ = sender.send(Message::Close(None)).await;
        return;
    }
    service.welcome(&peer_id);

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let service = service.clone();
        let peer_id = peer_id.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<SignalMessage>(text.as_str()) {
                        Ok(signal) => service.handle_signal(&peer_id, signal).await,
                        Err(e) => {
                            warn!("Invalid SignalMessage from {}: {:?}", peer_id, e);
                            service.send_signal(
                                &peer_id,
                                SignalMessage::Error {
                                    message: format!("malformed message: {e}"),
                                },
                            );
                        }
                    },
                    Message::Binary(data) => service.publish(&peer_id, data),
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    service.remove_peer(&peer_id).await;
    info!("WebSocket disconnected: {}", peer_id);
}
