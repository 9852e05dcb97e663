use duet_core::{PeerId, RoomId, SignalMessage};
use duet_relay::RoomCommand;

use crate::integration::{create_test_room, init_tracing};
use crate::utils::{expect_quiet, next_signal};

#[tokio::test]
async fn test_third_peer_is_rejected() {
    init_tracing();

    let mut room = create_test_room(2);
    let peers = [PeerId::new(), PeerId::new(), PeerId::new()];

    for peer_id in &peers {
        room.cmd_tx
            .send(RoomCommand::Join {
                peer_id: peer_id.clone(),
            })
            .await
            .unwrap();
    }

    // PeerJoined for the second peer, then the rejection.
    let joined = next_signal(&mut room.signal_rx).await.unwrap();
    assert_eq!(joined.peer_id, peers[0]);

    let rejected = next_signal(&mut room.signal_rx).await.unwrap();
    assert_eq!(rejected.peer_id, peers[2]);
    assert_eq!(
        rejected.message,
        SignalMessage::RoomFull {
            room: RoomId::from("room-1")
        }
    );
    expect_quiet(&mut room.signal_rx).await.unwrap();
}
