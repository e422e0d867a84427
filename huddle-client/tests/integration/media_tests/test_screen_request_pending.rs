use std::time::Duration;

use huddle_client::media::DeviceKind;
use huddle_client::{MediaError, SessionError};
use huddle_core::TrackKind;

use crate::integration::{create_mesh, init_tracing, is_linked, wait_for_snapshot, wait_linked};

#[tokio::test(start_paused = true)]
async fn test_leave_cuts_pending_screen_request() {
    init_tracing();

    let mesh = create_mesh();
    let p1 = mesh.participant("p1");
    let (h1, _e1) = p1.join(&mesh).await;

    // The picker never answers.
    p1.backend.stall(DeviceKind::Screen);
    let share = tokio::spawn({
        let h1 = h1.clone();
        async move { h1.set_screen_share(true).await }
    });
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(!h1.snapshot().media.screen_sharing);

    tokio::time::timeout(Duration::from_secs(60), h1.leave())
        .await
        .expect("leave waited for the screen picker");

    assert_eq!(share.await.unwrap(), Err(SessionError::Left));
    assert!(!p1.backend.is_open(DeviceKind::Camera));
    assert!(!p1.backend.is_open(DeviceKind::Microphone));

    // Answering the picker late opens nothing.
    p1.backend.unstall(DeviceKind::Screen);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(!p1.backend.is_open(DeviceKind::Screen));
}

#[tokio::test(start_paused = true)]
async fn test_room_keeps_running_while_screen_pending() {
    init_tracing();

    let mesh = create_mesh();
    let p1 = mesh.participant("p1");
    let p2 = mesh.participant("p2");

    let (h1, _e1) = p1.join(&mesh).await;
    p1.backend.stall(DeviceKind::Screen);
    let share = tokio::spawn({
        let h1 = h1.clone();
        async move { h1.set_screen_share(true).await }
    });
    tokio::time::sleep(Duration::from_secs(1)).await;

    // Presence and negotiation go on; the newcomer gets the camera.
    let (h2, _e2) = p2.join(&mesh).await;
    wait_linked(&h1, &p2.id).await;
    let s2 = wait_linked(&h2, &p1.id).await;
    assert_eq!(
        s2.peer(&p1.id).map(|p| p.tracks.clone()),
        Some(vec![TrackKind::Audio, TrackKind::Video])
    );

    p1.backend.unstall(DeviceKind::Screen);
    assert_eq!(share.await.unwrap(), Ok(()));
    assert!(h1.snapshot().media.screen_sharing);
    assert!(!p1.backend.is_open(DeviceKind::Camera));

    wait_for_snapshot(&h2, |s| {
        is_linked(s, &p1.id)
            && s.peer(&p1.id).map(|p| p.tracks.clone())
                == Some(vec![TrackKind::Audio, TrackKind::Screen])
    })
    .await;

    h1.leave().await;
    h2.leave().await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_share_withdraws_pending_request() {
    init_tracing();

    let mesh = create_mesh();
    let p1 = mesh.participant("p1");
    let (h1, _e1) = p1.join(&mesh).await;

    p1.backend.stall(DeviceKind::Screen);
    let share = tokio::spawn({
        let h1 = h1.clone();
        async move { h1.set_screen_share(true).await }
    });
    tokio::time::sleep(Duration::from_secs(1)).await;

    h1.set_screen_share(false).await.unwrap();
    assert_eq!(
        share.await.unwrap(),
        Err(SessionError::CaptureDenied(MediaError::Cancelled(
            DeviceKind::Screen
        )))
    );
    assert!(p1.backend.is_open(DeviceKind::Camera));
    assert!(!h1.snapshot().media.screen_sharing);

    p1.backend.unstall(DeviceKind::Screen);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(!p1.backend.is_open(DeviceKind::Screen));

    h1.leave().await;
}
