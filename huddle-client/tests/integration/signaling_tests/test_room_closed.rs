use huddle_client::media::DeviceKind;
use huddle_client::{PeerLeftReason, SessionError, SessionEvent};
use huddle_core::ConnectionStatus;

use crate::integration::{collect_until, create_mesh, init_tracing, wait_linked};

#[tokio::test(start_paused = true)]
async fn test_room_closure_terminates_sessions() {
    init_tracing();

    let mesh = create_mesh();
    let p1 = mesh.participant("p1");
    let p2 = mesh.participant("p2");

    let (h1, mut e1) = p1.join(&mesh).await;
    let (h2, _e2) = p2.join(&mesh).await;
    wait_linked(&h1, &p2.id).await;
    wait_linked(&h2, &p1.id).await;

    mesh.service.registry().close_room(&mesh.room_id).await;

    let seen = collect_until(&mut e1, |e| matches!(e, SessionEvent::Terminated { .. })).await;
    assert_eq!(
        seen.last(),
        Some(&SessionEvent::Terminated {
            error: Some(SessionError::RoomClosed)
        })
    );
    assert!(seen.contains(&SessionEvent::PeerLeft {
        peer_id: p2.id.clone(),
        reason: PeerLeftReason::SessionEnded,
    }));
    assert!(seen.contains(&SessionEvent::StatusChanged(ConnectionStatus::Disconnected)));

    assert!(!h1.snapshot().active);
    assert!(!p1.backend.is_open(DeviceKind::Camera));
    assert!(!p1.backend.is_open(DeviceKind::Microphone));

    // The handle outlives the session; leaving now returns at once.
    h1.leave().await;
    assert_eq!(
        h1.set_local_audio_enabled(false).await,
        Err(SessionError::Left)
    );
}
