use duet_client::session::MediaKind;
use duet_client::{MediaAccessError, SessionState};
use duet_core::{PeerId, RoomId, SdpKind, SignalMessage};

use crate::integration::{create_test_session, init_tracing};
use crate::utils::{
    LinkCall, MockMediaDevices, eventually, expect_no_send, next_sent, wait_for_state,
};

#[tokio::test]
async fn test_denied_media_leaves_session_inert() {
    init_tracing();

    let mut session = create_test_session(MockMediaDevices::denied());
    let result = session.engine.join(RoomId::from("room-1")).await;

    assert_eq!(result.err(), Some(MediaAccessError::PermissionDenied));
    assert_eq!(session.signaling.listener_count(), 0);
    assert_eq!(session.connector.link_count(), 0);
    expect_no_send(&mut session.sent_rx).await.unwrap();
}

#[tokio::test]
async fn test_join_announces_presence() {
    init_tracing();

    let mut session = create_test_session(MockMediaDevices::granted());
    let handle = session.engine.join(RoomId::from("room-1")).await.unwrap();

    let sent = next_sent(&mut session.sent_rx).await.unwrap();
    assert_eq!(
        sent,
        SignalMessage::Join {
            room: RoomId::from("room-1")
        }
    );
    assert_eq!(handle.state(), SessionState::New);
    assert_eq!(session.connector.link_count(), 1);
    assert_eq!(handle.local_media().tracks().len(), 2);
}

#[tokio::test]
async fn test_existing_member_offers_to_newcomer() {
    init_tracing();

    let mut session = create_test_session(MockMediaDevices::granted());
    let room = RoomId::from("room-1");
    let handle = session.engine.join(room.clone()).await.unwrap();
    next_sent(&mut session.sent_rx).await.unwrap();

    session.signaling.inject(SignalMessage::PeerJoined {
        room: room.clone(),
        peer_id: PeerId::new(),
    });

    match next_sent(&mut session.sent_rx).await.unwrap() {
        SignalMessage::Offer { room: r, description } => {
            assert_eq!(r, room);
            assert_eq!(description.kind, SdpKind::Offer);
        }
        other => panic!("Expected an offer, got {:?}", other),
    }
    wait_for_state(&handle, SessionState::HaveLocalOffer)
        .await
        .unwrap();

    let generation = session.connector.sink(0).generation();
    assert_eq!(
        session.connector.calls_for(generation),
        vec![LinkCall::CreateOffer, LinkCall::SetLocal(SdpKind::Offer)]
    );
}

#[tokio::test]
async fn test_newcomer_waits_for_offer() {
    init_tracing();

    let mut session = create_test_session(MockMediaDevices::granted());
    let room = RoomId::from("room-1");
    let handle = session.engine.join(room.clone()).await.unwrap();
    next_sent(&mut session.sent_rx).await.unwrap();

    // Nobody announces a newcomer to us, so we never offer.
    expect_no_send(&mut session.sent_rx).await.unwrap();
    assert_eq!(handle.state(), SessionState::New);

    session.signaling.inject(SignalMessage::Offer {
        room: room.clone(),
        description: duet_core::SessionDescription::offer("remote-offer"),
    });

    match next_sent(&mut session.sent_rx).await.unwrap() {
        SignalMessage::Answer { description, .. } => {
            assert_eq!(description.kind, SdpKind::Answer)
        }
        other => panic!("Expected an answer, got {:?}", other),
    }
    wait_for_state(&handle, SessionState::HaveRemoteOffer)
        .await
        .unwrap();

    let generation = session.connector.sink(0).generation();
    eventually("answer applied", || {
        session.connector.calls_for(generation)
            == vec![
                LinkCall::SetRemote(SdpKind::Offer),
                LinkCall::CreateAnswer,
                LinkCall::SetLocal(SdpKind::Answer),
            ]
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_signals_of_other_rooms_are_ignored() {
    init_tracing();

    let mut session = create_test_session(MockMediaDevices::granted());
    let handle = session.engine.join(RoomId::from("room-1")).await.unwrap();
    next_sent(&mut session.sent_rx).await.unwrap();

    session.signaling.inject(SignalMessage::PeerJoined {
        room: RoomId::from("room-2"),
        peer_id: PeerId::new(),
    });

    expect_no_send(&mut session.sent_rx).await.unwrap();
    assert_eq!(handle.state(), SessionState::New);
}

#[tokio::test]
async fn test_toggles_flip_local_tracks_only() {
    init_tracing();

    let mut session = create_test_session(MockMediaDevices::granted());
    let handle = session.engine.join(RoomId::from("room-1")).await.unwrap();
    next_sent(&mut session.sent_rx).await.unwrap();

    assert_eq!(handle.toggle_audio(), Some(false));
    assert_eq!(handle.toggle_video(), Some(false));
    assert_eq!(handle.toggle_audio(), Some(true));

    let media = handle.local_media();
    assert_eq!(media.is_enabled(MediaKind::Audio), Some(true));
    assert_eq!(media.is_enabled(MediaKind::Video), Some(false));

    // Toggling never renegotiates.
    expect_no_send(&mut session.sent_rx).await.unwrap();
    assert_eq!(session.connector.calls(), vec![]);
}

#[tokio::test]
async fn test_join_without_relay_fails() {
    init_tracing();

    let mut session = create_test_session(MockMediaDevices::granted());
    session.signaling.set_offline(true);
    let handle = session.engine.join(RoomId::from("room-1")).await.unwrap();

    wait_for_state(&handle, SessionState::Failed).await.unwrap();
    expect_no_send(&mut session.sent_rx).await.unwrap();

    handle.leave().await;
    assert_eq!(handle.state(), SessionState::Closed);
    assert!(handle.local_media().tracks().iter().all(|t| t.is_stopped()));
}
