use huddle_core::{PeerId, SignalPayload};

use crate::integration::{create_test_registry, init_tracing};

#[tokio::test]
async fn test_join_fans_out_presence() {
    init_tracing();

    let test = create_test_registry();
    let p1 = PeerId::from("p1");
    let p2 = PeerId::from("p2");
    let p3 = PeerId::from("p3");

    test.join(&p1, 1).await;
    test.join(&p2, 2).await;
    test.join(&p3, 3).await;

    // Join order is preserved.
    assert_eq!(test.members().await, vec![p1.clone(), p2.clone(), p3.clone()]);

    // The newest peer learns about everyone already present, oldest first.
    assert_eq!(
        test.signaling.payloads_for(&p3).await,
        vec![SignalPayload::Welcome {
            peers: vec![p1.clone(), p2.clone()],
            resumed: false
        }]
    );

    // Existing members hear about each later join exactly once.
    assert_eq!(
        test.signaling.presence_seen_by(&p1).await,
        vec![("join", p2.clone()), ("join", p3.clone())]
    );
    assert_eq!(
        test.signaling.presence_seen_by(&p2).await,
        vec![("join", p3.clone())]
    );
}
