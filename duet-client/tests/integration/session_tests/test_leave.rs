use duet_client::SessionState;
use duet_core::{PeerId, RoomId, SignalMessage};

use crate::integration::{create_test_session, init_tracing};
use crate::utils::{LinkCall, MockMediaDevices, expect_no_send, next_sent};

#[tokio::test]
async fn test_leave_is_idempotent() {
    init_tracing();

    let mut session = create_test_session(MockMediaDevices::granted());
    let room = RoomId::from("room-1");
    let handle = session.engine.join(room.clone()).await.unwrap();
    next_sent(&mut session.sent_rx).await.unwrap();

    session.signaling.inject(SignalMessage::PeerJoined {
        room: room.clone(),
        peer_id: PeerId::new(),
    });
    next_sent(&mut session.sent_rx).await.unwrap();

    handle.leave().await;
    handle.leave().await;
    handle.clone().leave().await;

    assert_eq!(
        next_sent(&mut session.sent_rx).await.unwrap(),
        SignalMessage::Leave { room: room.clone() }
    );
    expect_no_send(&mut session.sent_rx).await.unwrap();

    assert_eq!(handle.state(), SessionState::Closed);
    assert!(handle.local_media().tracks().iter().all(|t| t.is_stopped()));
    assert_eq!(session.signaling.listener_count(), 0);

    let closes = session
        .connector
        .calls()
        .into_iter()
        .filter(|(_, call)| *call == LinkCall::Close)
        .count();
    assert_eq!(closes, 1);
}

#[tokio::test]
async fn test_leave_before_negotiation() {
    init_tracing();

    let mut session = create_test_session(MockMediaDevices::granted());
    let room = RoomId::from("room-1");
    let handle = session.engine.join(room.clone()).await.unwrap();
    next_sent(&mut session.sent_rx).await.unwrap();

    handle.leave().await;

    assert_eq!(
        next_sent(&mut session.sent_rx).await.unwrap(),
        SignalMessage::Leave { room }
    );
    assert_eq!(handle.state(), SessionState::Closed);
    assert!(handle.local_media().tracks().iter().all(|t| t.is_stopped()));
}

#[tokio::test]
async fn test_signals_after_leave_do_nothing() {
    init_tracing();

    let mut session = create_test_session(MockMediaDevices::granted());
    let room = RoomId::from("room-1");
    let handle = session.engine.join(room.clone()).await.unwrap();
    next_sent(&mut session.sent_rx).await.unwrap();

    let sink = session.connector.sink(0);
    handle.leave().await;
    next_sent(&mut session.sent_rx).await.unwrap();

    session.signaling.inject(SignalMessage::PeerJoined {
        room: room.clone(),
        peer_id: PeerId::new(),
    });
    sink.emit(duet_client::session::PeerEvent::StateChanged(
        duet_client::session::LinkState::Connected,
    ));

    expect_no_send(&mut session.sent_rx).await.unwrap();
    assert_eq!(handle.state(), SessionState::Closed);
}
