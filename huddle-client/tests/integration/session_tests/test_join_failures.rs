use huddle_client::media::DeviceKind;
use huddle_client::{MediaError, SessionError};

use crate::integration::{create_mesh, init_tracing};

#[tokio::test]
async fn test_denied_microphone_releases_camera() {
    init_tracing();

    let mesh = create_mesh();
    let p1 = mesh.participant("p1");
    p1.backend.deny(DeviceKind::Microphone);

    let err = match p1.controller.join(mesh.room_id.clone()).await {
        Ok(_) => panic!("join should fail without a microphone"),
        Err(e) => e,
    };

    assert_eq!(
        err,
        SessionError::MediaUnavailable(MediaError::PermissionDenied(DeviceKind::Microphone))
    );
    assert!(!p1.backend.is_open(DeviceKind::Camera));
    assert!(!mesh.service.registry().contains_room(&mesh.room_id));
}

#[tokio::test]
async fn test_missing_camera_fails_join() {
    init_tracing();

    let mesh = create_mesh();
    let p1 = mesh.participant("p1");
    p1.backend.unplug(DeviceKind::Camera);

    let err = match p1.controller.join(mesh.room_id.clone()).await {
        Ok(_) => panic!("join should fail without a camera"),
        Err(e) => e,
    };

    assert_eq!(
        err,
        SessionError::MediaUnavailable(MediaError::DeviceNotFound(DeviceKind::Camera))
    );
    assert!(!p1.backend.is_open(DeviceKind::Microphone));
}

#[tokio::test]
async fn test_unreachable_relay_releases_media() {
    init_tracing();

    let mesh = create_mesh();
    let p1 = mesh.participant("p1");
    mesh.connector.set_reachable(&p1.id, false);

    let err = match p1.controller.join(mesh.room_id.clone()).await {
        Ok(_) => panic!("join should fail without a relay"),
        Err(e) => e,
    };

    assert!(matches!(err, SessionError::SignalingUnavailable(_)));
    assert!(!p1.backend.is_open(DeviceKind::Camera));
    assert!(!p1.backend.is_open(DeviceKind::Microphone));

    // Once the relay is back the same devices can be acquired.
    mesh.connector.set_reachable(&p1.id, true);
    let (handle, _events) = p1.join(&mesh).await;
    assert!(p1.backend.is_open(DeviceKind::Camera));
    handle.leave().await;
}
