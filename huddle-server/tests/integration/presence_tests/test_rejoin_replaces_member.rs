use huddle_core::{PeerId, SignalPayload};

use crate::integration::{create_test_registry, init_tracing};

#[tokio::test]
async fn test_rejoin_after_leave_is_fresh() {
    init_tracing();

    let test = create_test_registry();
    let p1 = PeerId::from("p1");
    let p2 = PeerId::from("p2");

    test.join(&p1, 1).await;
    test.join(&p2, 2).await;
    test.leave(&p2).await;
    test.join(&p2, 3).await;

    assert_eq!(test.members().await, vec![p1.clone(), p2.clone()]);
    assert_eq!(
        test.signaling.presence_seen_by(&p1).await,
        vec![
            ("join", p2.clone()),
            ("leave", p2.clone()),
            ("join", p2.clone())
        ]
    );
}

#[tokio::test]
async fn test_duplicate_join_never_duplicates_member() {
    init_tracing();

    let test = create_test_registry();
    let p1 = PeerId::from("p1");
    let p2 = PeerId::from("p2");

    test.join(&p1, 1).await;
    test.join(&p2, 2).await;
    test.join(&p2, 3).await;

    assert_eq!(test.members().await, vec![p1.clone(), p2.clone()]);
    // The second join is a resume: p1 hears nothing new.
    assert_eq!(
        test.signaling.presence_seen_by(&p1).await,
        vec![("join", p2.clone())]
    );
    assert_eq!(
        test.signaling.payloads_for(&p2).await.last(),
        Some(&SignalPayload::Welcome {
            peers: vec![p1.clone()],
            resumed: true
        })
    );
}
