use duet_client::relay::Signaling;
use duet_client::{RelayClient, ReconnectConfig, TransportError};
use duet_core::{RoomId, SignalMessage};
use duet_relay::RelayConfig;
use std::time::Duration;

use crate::integration::{init_tracing, start_relay};
use crate::utils::eventually;

#[tokio::test]
async fn test_client_learns_identity_and_ice_config() {
    init_tracing();

    let (addr, service) = start_relay(RelayConfig::default()).await;
    let client = RelayClient::connect(format!("ws://{addr}/ws"), ReconnectConfig::default());
    client.wait_connected(Duration::from_secs(3)).await.unwrap();

    eventually("welcome and ice config", || {
        client.peer_id().is_some() && client.ice_servers().is_some()
    })
    .await
    .unwrap();

    let peer_id = client.peer_id().unwrap();
    assert!(service.is_connected(&peer_id));
    assert_eq!(client.ice_servers(), Some(service.get_ice_servers()));

    client.close().await;
}

#[tokio::test]
async fn test_close_is_idempotent() {
    init_tracing();

    let (addr, service) = start_relay(RelayConfig::default()).await;
    let client = RelayClient::connect(format!("ws://{addr}/ws"), ReconnectConfig::default());
    client.wait_connected(Duration::from_secs(3)).await.unwrap();
    eventually("relay sees the client", || service.peer_count() == 1)
        .await
        .unwrap();

    client.close().await;
    client.close().await;
    client.clone().close().await;

    assert!(!client.is_connected());
    let result = client
        .send(SignalMessage::Join {
            room: RoomId::from("room-1"),
        })
        .await;
    assert!(matches!(result, Err(TransportError::Closed)));

    eventually("relay dropped the client", || service.peer_count() == 0)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unreachable_relay_stays_offline() {
    init_tracing();

    let client = RelayClient::connect("ws://127.0.0.1:1/ws", ReconnectConfig::default());

    let result = client.wait_connected(Duration::from_millis(300)).await;
    assert!(matches!(result, Err(TransportError::Offline)));

    let sent = client.send(SignalMessage::Ping).await;
    assert!(matches!(sent, Err(TransportError::Offline)));

    client.close().await;
}
