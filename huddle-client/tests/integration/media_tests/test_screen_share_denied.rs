use huddle_client::media::DeviceKind;
use huddle_client::{MediaError, SessionError, SessionEvent};
use huddle_core::TrackKind;

use crate::integration::{create_mesh, drain, init_tracing, wait_linked};

#[tokio::test(start_paused = true)]
async fn test_denied_screen_share_keeps_camera() {
    init_tracing();

    let mesh = create_mesh();
    let p1 = mesh.participant("p1");
    let p2 = mesh.participant("p2");

    let (h1, _e1) = p1.join(&mesh).await;
    let (h2, mut e2) = p2.join(&mesh).await;
    wait_linked(&h1, &p2.id).await;
    wait_linked(&h2, &p1.id).await;
    drain(&mut e2);

    p1.backend.deny(DeviceKind::Screen);
    let result = h1.set_screen_share(true).await;

    assert_eq!(
        result,
        Err(SessionError::CaptureDenied(MediaError::PermissionDenied(
            DeviceKind::Screen
        )))
    );
    assert!(!h1.snapshot().media.screen_sharing);
    assert!(p1.backend.is_open(DeviceKind::Camera));

    // Give any stray renegotiation a chance to show up.
    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
    assert!(
        !drain(&mut e2)
            .iter()
            .any(|e| matches!(e, SessionEvent::TrackRemoved { .. }))
    );
    let s2 = wait_linked(&h2, &p1.id).await;
    assert_eq!(
        s2.peer(&p1.id).map(|p| p.tracks.clone()),
        Some(vec![TrackKind::Audio, TrackKind::Video])
    );

    h1.leave().await;
    h2.leave().await;
}
