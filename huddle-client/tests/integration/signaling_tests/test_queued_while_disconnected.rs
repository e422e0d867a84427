use std::time::Duration;

use huddle_client::SessionEvent;

use crate::integration::{collect_until, create_mesh, drain, init_tracing, wait_linked};

#[tokio::test(start_paused = true)]
async fn test_messages_sent_during_outage_arrive_in_order() {
    init_tracing();

    let mesh = create_mesh();
    let p1 = mesh.participant("p1");
    let p2 = mesh.participant("p2");

    let (h1, mut e1) = p1.join(&mesh).await;
    let (h2, mut e2) = p2.join(&mesh).await;
    wait_linked(&h1, &p2.id).await;
    wait_linked(&h2, &p1.id).await;
    drain(&mut e2);

    mesh.connector.set_reachable(&p1.id, false);
    mesh.connector.drop_link(&p1.id);
    collect_until(&mut e1, |e| *e == SessionEvent::SignalingInterrupted).await;

    h1.set_local_audio_enabled(false).await.unwrap();
    h1.set_local_video_enabled(false).await.unwrap();
    h1.set_local_audio_enabled(true).await.unwrap();

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(drain(&mut e2).is_empty());
    mesh.connector.set_reachable(&p1.id, true);

    let last = SessionEvent::RemoteMediaState {
        peer_id: p1.id.clone(),
        audio_enabled: true,
        video_enabled: false,
    };
    let seen = collect_until(&mut e2, |e| *e == last).await;

    let states: Vec<(bool, bool)> = seen
        .iter()
        .filter_map(|e| match e {
            SessionEvent::RemoteMediaState {
                audio_enabled,
                video_enabled,
                ..
            } => Some((*audio_enabled, *video_enabled)),
            _ => None,
        })
        .collect();
    assert_eq!(states, vec![(false, true), (false, false), (true, false)]);

    h1.leave().await;
    h2.leave().await;
}
