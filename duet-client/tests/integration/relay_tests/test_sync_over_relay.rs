use duet_client::sync::SharedBuffer;
use duet_client::{RelayClient, ReconnectConfig, SyncEngine};
use duet_core::doc::TextSplice;
use duet_core::{PeerId, RoomId};
use duet_relay::RelayConfig;
use std::sync::Arc;
use std::time::Duration;

use crate::integration::{fast_sync_config, init_tracing, start_relay};
use crate::utils::{MockExecutor, eventually};

async fn connect(addr: std::net::SocketAddr) -> RelayClient {
    let client = RelayClient::connect(format!("ws://{addr}/ws"), ReconnectConfig::default());
    client.wait_connected(Duration::from_secs(3)).await.unwrap();
    client
}

#[tokio::test]
async fn test_documents_sync_through_relay() {
    init_tracing();

    let (addr, service) = start_relay(RelayConfig::default()).await;
    let room = RoomId::from("interview-1");
    let topic = room.sync_topic();
    let nobody = PeerId::new();

    let client_a = connect(addr).await;
    let client_b = connect(addr).await;
    let engine_a = SyncEngine::new(
        Arc::new(client_a.clone()),
        Arc::new(MockExecutor::idle()),
        fast_sync_config(),
    );
    let engine_b = SyncEngine::new(
        Arc::new(client_b.clone()),
        Arc::new(MockExecutor::idle()),
        fast_sync_config(),
    );

    let a = engine_a.attach(&room).await.unwrap();
    eventually("a subscribed", || {
        service.topics().audience(&topic, &nobody).len() == 1
    })
    .await
    .unwrap();
    let b = engine_b.attach(&room).await.unwrap();

    let view_b = SharedBuffer::default();
    let _binding_b = b.bind_editor(view_b.clone()).unwrap();
    a.bind_editor(SharedBuffer::default())
        .unwrap()
        .edit(TextSplice {
            index: 0,
            delete: 0,
            insert: "console.log(1)".to_owned(),
        })
        .unwrap();

    eventually("b received the edit", || view_b.text() == "console.log(1)")
        .await
        .unwrap();
    eventually("shared language", || {
        a.language().is_some() && a.language() == b.language()
    })
    .await
    .unwrap();
    eventually("presence", || a.peer_count() == 1 && b.peer_count() == 1)
        .await
        .unwrap();

    b.detach().await;
    eventually("b unsubscribed", || {
        service.topics().audience(&topic, &nobody).len() == 1
    })
    .await
    .unwrap();
    eventually("a saw b leave", || a.peer_count() == 0)
        .await
        .unwrap();

    a.detach().await;
    client_a.close().await;
    client_b.close().await;
}
