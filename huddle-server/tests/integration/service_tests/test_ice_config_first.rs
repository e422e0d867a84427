use std::sync::Arc;

use huddle_core::{IceServerConfig, PeerId, RoomId, SignalMessage, SignalPayload};
use huddle_server::{RegistryConfig, SignalingService};

use crate::integration::init_tracing;
use crate::utils::RecordingPresence;

fn turn_server() -> IceServerConfig {
    IceServerConfig {
        urls: vec!["turn:turn.example.org:3478".to_string()],
        username: Some("user".to_string()),
        credential: Some("secret".to_string()),
    }
}

#[tokio::test]
async fn test_connect_sends_ice_config_before_welcome() {
    init_tracing();

    let service = SignalingService::new(
        RegistryConfig::default(),
        vec![turn_server()],
        Arc::new(RecordingPresence::new()),
    );
    let room = RoomId::from("r1");
    let p1 = PeerId::from("p1");

    let mut attachment = service.connect(&room, &p1);
    service
        .ingest(
            &room,
            &p1,
            attachment.epoch,
            SignalMessage::new(room.clone(), p1.clone(), SignalPayload::Join),
        )
        .await;

    let first = attachment.rx.recv().await.map(|m| m.payload);
    assert_eq!(
        first,
        Some(SignalPayload::IceConfig {
            ice_servers: vec![turn_server()]
        })
    );

    let second = attachment.rx.recv().await.map(|m| m.payload);
    assert_eq!(
        second,
        Some(SignalPayload::Welcome {
            peers: vec![],
            resumed: false
        })
    );
}

#[tokio::test]
async fn test_no_ice_config_without_servers() {
    init_tracing();

    let service = SignalingService::new(
        RegistryConfig::default(),
        Vec::new(),
        Arc::new(RecordingPresence::new()),
    );
    let room = RoomId::from("r1");
    let p1 = PeerId::from("p1");

    let mut attachment = service.connect(&room, &p1);
    service
        .ingest(
            &room,
            &p1,
            attachment.epoch,
            SignalMessage::new(room.clone(), p1.clone(), SignalPayload::Join),
        )
        .await;

    let first = attachment.rx.recv().await.map(|m| m.payload.name());
    assert_eq!(first, Some("welcome"));
}
