use huddle_core::{PeerId, SignalPayload};

use crate::integration::{create_test_registry, init_tracing};

#[tokio::test]
async fn test_relay_from_non_member_is_dropped() {
    init_tracing();

    let test = create_test_registry();
    let p1 = PeerId::from("p1");
    let stranger = PeerId::from("stranger");

    test.join(&p1, 1).await;
    test.signaling.clear().await;

    test.relay(
        &stranger,
        Some(&p1),
        SignalPayload::Offer {
            sdp: "sneaky".to_string(),
            ice_restart: false,
        },
    )
    .await;

    assert_eq!(test.members().await, vec![p1.clone()]);
    assert!(test.signaling.messages_for(&p1).await.is_empty());
}
