use huddle_client::media::DeviceKind;
use huddle_client::SessionEvent;
use huddle_core::TrackKind;

use crate::integration::{
    collect_until, create_mesh, init_tracing, is_linked, wait_for_snapshot, wait_linked,
};

#[tokio::test(start_paused = true)]
async fn test_platform_ending_share_restores_camera() {
    init_tracing();

    let mesh = create_mesh();
    let p1 = mesh.participant("p1");
    let p2 = mesh.participant("p2");

    let (h1, mut e1) = p1.join(&mesh).await;
    let (h2, _e2) = p2.join(&mesh).await;
    wait_linked(&h1, &p2.id).await;
    wait_linked(&h2, &p1.id).await;

    h1.set_screen_share(true).await.unwrap();
    wait_for_snapshot(&h2, |s| {
        is_linked(s, &p1.id)
            && s.peer(&p1.id).map(|p| p.tracks.clone())
                == Some(vec![TrackKind::Audio, TrackKind::Screen])
    })
    .await;

    // The user stops sharing from the system's own control.
    assert!(p1.backend.end(DeviceKind::Screen));

    let seen = collect_until(&mut e1, |e| {
        matches!(e, SessionEvent::LocalMediaChanged(state) if !state.screen_sharing)
    })
    .await;
    assert!(!seen.iter().any(|e| matches!(e, SessionEvent::PeerLeft { .. })));
    assert!(p1.backend.is_open(DeviceKind::Camera));
    assert!(!h1.snapshot().media.screen_sharing);

    let s2 = wait_for_snapshot(&h2, |s| {
        is_linked(s, &p1.id)
            && s.peer(&p1.id).map(|p| p.tracks.clone())
                == Some(vec![TrackKind::Audio, TrackKind::Video])
    })
    .await;
    assert_eq!(s2.peers.len(), 1);

    // Sharing works again afterwards.
    h1.set_screen_share(true).await.unwrap();
    assert!(p1.backend.is_open(DeviceKind::Screen));

    h1.leave().await;
    h2.leave().await;
}
