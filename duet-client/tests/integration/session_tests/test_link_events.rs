use duet_client::SessionState;
use duet_client::session::{LinkState, MediaKind, PeerEvent, RemoteTrack};
use duet_core::{IceCandidate, PeerId, RoomId, SignalMessage};

use crate::integration::{create_test_session, init_tracing};
use crate::utils::{MockMediaDevices, eventually, next_sent, wait_for_state};

fn remote_track(kind: MediaKind) -> RemoteTrack {
    RemoteTrack {
        id: format!("remote-{kind}"),
        stream_id: "remote".to_owned(),
        kind,
        track: None,
    }
}

#[tokio::test]
async fn test_local_candidates_are_relayed() {
    init_tracing();

    let mut session = create_test_session(MockMediaDevices::granted());
    let room = RoomId::from("room-1");
    let _handle = session.engine.join(room.clone()).await.unwrap();
    next_sent(&mut session.sent_rx).await.unwrap();

    session
        .connector
        .sink(0)
        .emit(PeerEvent::LocalCandidate(IceCandidate::new("local-1")));

    assert_eq!(
        next_sent(&mut session.sent_rx).await.unwrap(),
        SignalMessage::Candidate {
            room,
            candidate: IceCandidate::new("local-1"),
        }
    );
}

#[tokio::test]
async fn test_link_state_and_tracks_are_published() {
    init_tracing();

    let mut session = create_test_session(MockMediaDevices::granted());
    let room = RoomId::from("room-1");
    let handle = session.engine.join(room.clone()).await.unwrap();
    next_sent(&mut session.sent_rx).await.unwrap();

    let sink = session.connector.sink(0);
    sink.emit(PeerEvent::RemoteTrack(remote_track(MediaKind::Audio)));
    sink.emit(PeerEvent::RemoteTrack(remote_track(MediaKind::Video)));
    sink.emit(PeerEvent::StateChanged(LinkState::Connected));

    wait_for_state(&handle, SessionState::Connected).await.unwrap();
    eventually("both remote tracks", || handle.remote_tracks().len() == 2)
        .await
        .unwrap();

    sink.emit(PeerEvent::StateChanged(LinkState::Disconnected));
    wait_for_state(&handle, SessionState::Disconnected)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_events_of_replaced_link_are_ignored() {
    init_tracing();

    let mut session = create_test_session(MockMediaDevices::granted());
    let room = RoomId::from("room-1");
    let handle = session.engine.join(room.clone()).await.unwrap();
    next_sent(&mut session.sent_rx).await.unwrap();

    let peer_id = PeerId::new();
    session.signaling.inject(SignalMessage::PeerJoined {
        room: room.clone(),
        peer_id: peer_id.clone(),
    });
    next_sent(&mut session.sent_rx).await.unwrap();

    session.signaling.inject(SignalMessage::PeerLeft {
        room: room.clone(),
        peer_id,
    });
    wait_for_state(&handle, SessionState::Disconnected)
        .await
        .unwrap();
    eventually("replacement link", || session.connector.link_count() == 2)
        .await
        .unwrap();

    let retired = session.connector.sink(0);
    retired.emit(PeerEvent::StateChanged(LinkState::Connected));
    retired.emit(PeerEvent::RemoteTrack(remote_track(MediaKind::Video)));
    retired.emit(PeerEvent::LocalCandidate(IceCandidate::new("stale")));

    crate::utils::expect_no_send(&mut session.sent_rx).await.unwrap();
    assert_eq!(handle.state(), SessionState::Disconnected);
    assert!(handle.remote_tracks().is_empty());
}
