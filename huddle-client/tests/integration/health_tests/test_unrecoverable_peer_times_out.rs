use std::time::Duration;

use huddle_client::{PeerLeftReason, SessionError, SessionEvent};
use huddle_core::{ConnectionStatus, HealthState};

use crate::integration::{collect_until, create_mesh, drain, init_tracing, wait_for_snapshot, wait_linked};

#[tokio::test(start_paused = true)]
async fn test_restart_attempts_exhausted_drops_peer() {
    init_tracing();

    let mesh = create_mesh();
    let p1 = mesh.participant("p1");
    let p2 = mesh.participant("p2");

    let (h1, mut e1) = p1.join(&mesh).await;
    let (h2, _e2) = p2.join(&mesh).await;
    wait_linked(&h1, &p2.id).await;
    wait_linked(&h2, &p1.id).await;
    drain(&mut e1);

    mesh.network.sever(&p1.id, &p2.id).await;

    // Restarts go out right away and then every five seconds.
    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(mesh.network.restart_offers(&p1.id, &p2.id), 3);

    let left = SessionEvent::PeerLeft {
        peer_id: p2.id.clone(),
        reason: PeerLeftReason::Failed(SessionError::PeerTimeout {
            peer: p2.id.clone(),
        }),
    };
    let seen = collect_until(&mut e1, |e| *e == left).await;
    assert!(seen.contains(&SessionEvent::HealthChanged {
        peer_id: p2.id.clone(),
        state: HealthState::Failed,
    }));

    // With nobody left to talk to the room is healthy again.
    let snapshot = wait_for_snapshot(&h1, |s| s.peers.is_empty()).await;
    assert_eq!(snapshot.status, ConnectionStatus::Connected);
    assert!(snapshot.active);

    h1.leave().await;
    h2.leave().await;
}
