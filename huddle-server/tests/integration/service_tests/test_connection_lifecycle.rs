use std::sync::Arc;
use std::time::Duration;

use huddle_core::{PeerId, RoomId, SignalMessage, SignalPayload};
use huddle_server::{RegistryConfig, SignalingService};

use crate::integration::init_tracing;
use crate::utils::{PresenceEvent, RecordingPresence};

fn join(room: &RoomId, claimed: &str) -> SignalMessage {
    SignalMessage::new(room.clone(), PeerId::from(claimed), SignalPayload::Join)
}

#[tokio::test]
async fn test_ingest_rewrites_claimed_sender() {
    init_tracing();

    let service = SignalingService::new(
        RegistryConfig::default(),
        Vec::new(),
        Arc::new(RecordingPresence::new()),
    );
    let room = RoomId::from("r1");
    let p1 = PeerId::from("p1");
    let p2 = PeerId::from("p2");

    let mut a1 = service.connect(&room, &p1);
    let mut a2 = service.connect(&room, &p2);
    service.ingest(&room, &p1, a1.epoch, join(&room, "p1")).await;
    service.ingest(&room, &p2, a2.epoch, join(&room, "p2")).await;

    // Welcome, then the join of p2.
    assert_eq!(a1.rx.recv().await.map(|m| m.payload.name()), Some("welcome"));
    assert_eq!(a1.rx.recv().await.map(|m| m.sender_id), Some(p2.clone()));
    assert_eq!(a2.rx.recv().await.map(|m| m.payload.name()), Some("welcome"));

    let forged = SignalMessage::new(
        RoomId::from("elsewhere"),
        PeerId::from("p3"),
        SignalPayload::Answer {
            sdp: "answer".to_string(),
        },
    )
    .to(p1.clone());
    service.ingest(&room, &p2, a2.epoch, forged).await;

    let relayed = a1.rx.recv().await;
    assert_eq!(relayed.as_ref().map(|m| &m.sender_id), Some(&p2));
    assert_eq!(relayed.as_ref().map(|m| &m.room_id), Some(&room));

    // Relay-only types from a peer are not forwarded.
    service
        .ingest(
            &room,
            &p2,
            a2.epoch,
            SignalMessage::new(room.clone(), p2.clone(), SignalPayload::RoomClosed),
        )
        .await;
    assert_eq!(service.registry().members(&room).await, vec![p1.clone(), p2.clone()]);
    assert!(a1.rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_within_grace_keeps_membership() {
    init_tracing();

    let presence = RecordingPresence::new();
    let service = SignalingService::new(
        RegistryConfig::default(),
        Vec::new(),
        Arc::new(presence.clone()),
    );
    let room = RoomId::from("r1");
    let p1 = PeerId::from("p1");
    let p2 = PeerId::from("p2");

    let a1 = service.connect(&room, &p1);
    let a2 = service.connect(&room, &p2);
    service.ingest(&room, &p1, a1.epoch, join(&room, "p1")).await;
    service.ingest(&room, &p2, a2.epoch, join(&room, "p2")).await;

    service.disconnect(&room, &p2, a2.epoch, Vec::new()).await;
    assert!(!service.links().is_connected(&room, &p2));

    tokio::time::sleep(Duration::from_secs(3)).await;

    let mut again = service.connect(&room, &p2);
    service.ingest(&room, &p2, again.epoch, join(&room, "p2")).await;

    // The old socket's teardown arriving late changes nothing.
    service.disconnect(&room, &p2, a2.epoch, Vec::new()).await;
    assert!(service.links().is_connected(&room, &p2));

    assert_eq!(
        again.rx.recv().await.map(|m| m.payload),
        Some(SignalPayload::Welcome {
            peers: vec![p1.clone()],
            resumed: true
        })
    );

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(service.registry().members(&room).await, vec![p1.clone(), p2.clone()]);
    assert!(!presence.has_leave(&p2).await);
}

#[tokio::test]
async fn test_close_room_notifies_members() {
    init_tracing();

    let presence = RecordingPresence::new();
    let service = SignalingService::new(
        RegistryConfig::default(),
        Vec::new(),
        Arc::new(presence.clone()),
    );
    let room = RoomId::from("r1");
    let p1 = PeerId::from("p1");

    let mut a1 = service.connect(&room, &p1);
    service.ingest(&room, &p1, a1.epoch, join(&room, "p1")).await;
    assert_eq!(a1.rx.recv().await.map(|m| m.payload.name()), Some("welcome"));

    service.registry().close_room(&room).await;

    assert_eq!(
        a1.rx.recv().await.map(|m| m.payload),
        Some(SignalPayload::RoomClosed)
    );

    // Wait for the room to unregister itself.
    while service.registry().contains_room(&room) {
        tokio::task::yield_now().await;
    }
    assert!(
        presence
            .get_events()
            .await
            .contains(&PresenceEvent::Closed { room_id: room.clone() })
    );
}
