use duet_core::{SignalMessage, TopicFrame};
use duet_relay::RelayConfig;

use crate::integration::{init_tracing, start_relay};
use crate::utils::TestWsClient;

#[tokio::test]
async fn test_frames_reach_other_subscribers_only() {
    init_tracing();

    let (addr, _service) = start_relay(RelayConfig::default()).await;
    let mut clients = Vec::new();
    for topic in ["code-r1", "code-r1", "code-r1", "code-r2"] {
        let mut client = TestWsClient::connect(addr).await.unwrap();
        client
            .send(&SignalMessage::Subscribe {
                topics: vec![topic.to_owned()],
            })
            .await
            .unwrap();
        client.barrier().await.unwrap();
        clients.push(client);
    }

    let frame = TopicFrame::new("code-r1", vec![1, 2, 3]).encode().unwrap();
    clients[0].send_binary(frame.clone()).await.unwrap();

    assert_eq!(clients[1].recv_binary().await.unwrap(), frame);
    assert_eq!(clients[2].recv_binary().await.unwrap(), frame);
    clients[0].expect_no_binary(200).await.unwrap();
    clients[3].expect_no_binary(200).await.unwrap();
}

#[tokio::test]
async fn test_unsubscribed_peer_stops_receiving() {
    init_tracing();

    let (addr, _service) = start_relay(RelayConfig::default()).await;
    let mut a = TestWsClient::connect(addr).await.unwrap();
    let mut b = TestWsClient::connect(addr).await.unwrap();
    for client in [&mut a, &mut b] {
        client
            .send(&SignalMessage::Subscribe {
                topics: vec!["code-r1".to_owned()],
            })
            .await
            .unwrap();
        client.barrier().await.unwrap();
    }

    b.send(&SignalMessage::Unsubscribe {
        topics: vec!["code-r1".to_owned()],
    })
    .await
    .unwrap();
    b.barrier().await.unwrap();

    let frame = TopicFrame::new("code-r1", vec![9]).encode().unwrap();
    a.send_binary(frame).await.unwrap();
    b.expect_no_binary(200).await.unwrap();
}
