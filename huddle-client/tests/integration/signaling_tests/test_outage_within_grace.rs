use std::time::Duration;

use huddle_client::SessionEvent;
use huddle_core::ConnectionStatus;

use crate::integration::{collect_until, create_mesh, drain, init_tracing, wait_linked};

#[tokio::test(start_paused = true)]
async fn test_short_outage_resumes_without_renegotiation() {
    init_tracing();

    let mesh = create_mesh();
    let p1 = mesh.participant("p1");
    let p2 = mesh.participant("p2");

    let (h1, mut e1) = p1.join(&mesh).await;
    let (h2, mut e2) = p2.join(&mesh).await;
    wait_linked(&h1, &p2.id).await;
    wait_linked(&h2, &p1.id).await;
    drain(&mut e1);
    drain(&mut e2);

    mesh.connector.set_reachable(&p1.id, false);
    mesh.connector.drop_link(&p1.id);

    let seen = collect_until(&mut e1, |e| *e == SessionEvent::SignalingInterrupted).await;
    assert_eq!(seen, vec![SessionEvent::SignalingInterrupted]);
    collect_until(&mut e1, |e| {
        *e == SessionEvent::StatusChanged(ConnectionStatus::Degraded)
    })
    .await;
    assert!(!h1.snapshot().signaling_up);

    tokio::time::sleep(Duration::from_secs(5)).await;
    mesh.connector.set_reachable(&p1.id, true);

    let seen = collect_until(&mut e1, |e| {
        matches!(e, SessionEvent::SignalingRestored { .. })
    })
    .await;
    assert_eq!(
        seen.last(),
        Some(&SessionEvent::SignalingRestored { resumed: true })
    );

    let s1 = wait_linked(&h1, &p2.id).await;
    assert!(s1.signaling_up);

    // The relay kept p1 as a member, so nobody saw it leave or rejoin.
    let restored = drain(&mut e1);
    assert!(
        !restored
            .iter()
            .any(|e| matches!(e, SessionEvent::PeerLeft { .. } | SessionEvent::PeerJoined { .. }))
    );
    assert!(
        !drain(&mut e2)
            .iter()
            .any(|e| matches!(e, SessionEvent::PeerLeft { .. } | SessionEvent::PeerJoined { .. }))
    );
    assert_eq!(
        mesh.service.registry().members(&mesh.room_id).await,
        vec![p1.id.clone(), p2.id.clone()]
    );

    h1.leave().await;
    h2.leave().await;
}
