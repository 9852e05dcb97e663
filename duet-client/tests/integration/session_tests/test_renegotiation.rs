use duet_client::SessionState;
use duet_core::{PeerId, RoomId, SdpKind, SessionDescription, SignalMessage};

use crate::integration::{create_test_session, init_tracing};
use crate::utils::{LinkCall, MockMediaDevices, eventually, next_sent, wait_for_state};

#[tokio::test]
async fn test_failed_negotiation_keeps_session_usable() {
    init_tracing();

    let mut session = create_test_session(MockMediaDevices::granted());
    let room = RoomId::from("room-1");
    let handle = session.engine.join(room.clone()).await.unwrap();
    next_sent(&mut session.sent_rx).await.unwrap();

    session.connector.fail_remote_descriptions();
    session.signaling.inject(SignalMessage::Offer {
        room: room.clone(),
        description: SessionDescription::offer("broken"),
    });
    wait_for_state(&handle, SessionState::Failed).await.unwrap();

    // The session still reacts: toggles work and leave cleans up.
    assert_eq!(handle.toggle_audio(), Some(false));
    handle.leave().await;
    assert_eq!(
        next_sent(&mut session.sent_rx).await.unwrap(),
        SignalMessage::Leave { room }
    );
    assert_eq!(handle.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_rejoining_peer_gets_a_fresh_offer() {
    init_tracing();

    let mut session = create_test_session(MockMediaDevices::granted());
    let room = RoomId::from("room-1");
    let handle = session.engine.join(room.clone()).await.unwrap();
    next_sent(&mut session.sent_rx).await.unwrap();

    let first = PeerId::new();
    session.signaling.inject(SignalMessage::PeerJoined {
        room: room.clone(),
        peer_id: first.clone(),
    });
    next_sent(&mut session.sent_rx).await.unwrap();
    session.signaling.inject(SignalMessage::PeerLeft {
        room: room.clone(),
        peer_id: first,
    });
    wait_for_state(&handle, SessionState::Disconnected)
        .await
        .unwrap();

    session.signaling.inject(SignalMessage::PeerJoined {
        room: room.clone(),
        peer_id: PeerId::new(),
    });
    assert!(matches!(
        next_sent(&mut session.sent_rx).await.unwrap(),
        SignalMessage::Offer { .. }
    ));
    wait_for_state(&handle, SessionState::HaveLocalOffer)
        .await
        .unwrap();

    let old = session.connector.sink(0).generation();
    let new = session.connector.sink(1).generation();
    assert_ne!(old, new);
    assert_eq!(
        session.connector.calls_for(old),
        vec![
            LinkCall::CreateOffer,
            LinkCall::SetLocal(SdpKind::Offer),
            LinkCall::Close,
        ]
    );
    eventually("offer on the new link", || {
        session.connector.calls_for(new)
            == vec![LinkCall::CreateOffer, LinkCall::SetLocal(SdpKind::Offer)]
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_room_full_marks_session_failed() {
    init_tracing();

    let mut session = create_test_session(MockMediaDevices::granted());
    let room = RoomId::from("room-1");
    let handle = session.engine.join(room.clone()).await.unwrap();
    next_sent(&mut session.sent_rx).await.unwrap();

    session.signaling.inject(SignalMessage::RoomFull { room });
    wait_for_state(&handle, SessionState::Failed).await.unwrap();
}
