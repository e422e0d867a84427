use huddle_core::{PeerId, SignalPayload};

use crate::integration::{create_test_registry, init_tracing};

#[tokio::test]
async fn test_untargeted_relay_reaches_every_other_member() {
    init_tracing();

    let test = create_test_registry();
    let p1 = PeerId::from("p1");
    let p2 = PeerId::from("p2");
    let p3 = PeerId::from("p3");

    for (i, peer) in [&p1, &p2, &p3].into_iter().enumerate() {
        test.join(peer, i as u64 + 1).await;
    }
    test.signaling.clear().await;

    let state = SignalPayload::MediaState {
        audio_enabled: false,
        video_enabled: true,
    };
    test.relay(&p2, None, state.clone()).await;
    test.members().await;

    assert_eq!(test.signaling.payloads_for(&p1).await, vec![state.clone()]);
    assert_eq!(test.signaling.payloads_for(&p3).await, vec![state]);
    assert!(test.signaling.payloads_for(&p2).await.is_empty());
}
