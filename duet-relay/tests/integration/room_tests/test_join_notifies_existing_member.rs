use duet_core::{PeerId, RoomId, SignalMessage};
use duet_relay::RoomCommand;

use crate::integration::{create_test_room, init_tracing};
use crate::utils::{expect_quiet, next_signal};

#[tokio::test]
async fn test_only_the_present_member_is_told_about_a_newcomer() {
    init_tracing();

    let mut room = create_test_room(2);
    let first = PeerId::new();
    let second = PeerId::new();

    room.cmd_tx
        .send(RoomCommand::Join {
            peer_id: first.clone(),
        })
        .await
        .unwrap();
    // Nobody to notify yet.
    expect_quiet(&mut room.signal_rx).await.unwrap();

    room.cmd_tx
        .send(RoomCommand::Join {
            peer_id: second.clone(),
        })
        .await
        .unwrap();

    let sent = next_signal(&mut room.signal_rx).await.unwrap();
    assert_eq!(sent.peer_id, first);
    assert_eq!(
        sent.message,
        SignalMessage::PeerJoined {
            room: RoomId::from("room-1"),
            peer_id: second.clone(),
        }
    );
    expect_quiet(&mut room.signal_rx).await.unwrap();
    assert!(room.signaling.sent_to(&second).await.is_empty());
}

#[tokio::test]
async fn test_repeated_join_is_ignored() {
    init_tracing();

    let mut room = create_test_room(2);
    let first = PeerId::new();
    let second = PeerId::new();

    for peer_id in [&first, &second, &second] {
        room.cmd_tx
            .send(RoomCommand::Join {
                peer_id: peer_id.clone(),
            })
            .await
            .unwrap();
    }

    next_signal(&mut room.signal_rx).await.unwrap();
    expect_quiet(&mut room.signal_rx).await.unwrap();
}
