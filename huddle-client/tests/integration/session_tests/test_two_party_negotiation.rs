use huddle_client::SessionEvent;
use huddle_core::{NegotiationState, TrackKind};

use crate::integration::{collect_until, create_mesh, init_tracing, wait_linked};

#[tokio::test(start_paused = true)]
async fn test_two_participants_negotiate_and_connect() {
    init_tracing();

    let mesh = create_mesh();
    let p1 = mesh.participant("p1");
    let p2 = mesh.participant("p2");

    let (h1, mut e1) = p1.join(&mesh).await;
    let (h2, mut e2) = p2.join(&mesh).await;

    let s1 = wait_linked(&h1, &p2.id).await;
    let s2 = wait_linked(&h2, &p1.id).await;

    let tracks = vec![TrackKind::Audio, TrackKind::Video];
    assert_eq!(s1.peer(&p2.id).map(|p| p.tracks.clone()), Some(tracks.clone()));
    assert_eq!(s2.peer(&p1.id).map(|p| p.tracks.clone()), Some(tracks));

    // The smaller id sends the offer; the other side only answers.
    let seen = collect_until(&mut e1, |e| {
        matches!(e, SessionEvent::NegotiationChanged { state: NegotiationState::Stable, .. })
    })
    .await;
    assert_eq!(seen.iter().filter(|e| matches!(e, SessionEvent::PeerJoined { .. })).count(), 1);
    assert!(seen.contains(&SessionEvent::NegotiationChanged {
        peer_id: p2.id.clone(),
        state: NegotiationState::OfferSent,
    }));

    let seen = collect_until(&mut e2, |e| {
        matches!(e, SessionEvent::NegotiationChanged { state: NegotiationState::Stable, .. })
    })
    .await;
    assert!(seen.contains(&SessionEvent::PeerJoined {
        peer_id: p1.id.clone()
    }));
    assert!(seen.contains(&SessionEvent::NegotiationChanged {
        peer_id: p1.id.clone(),
        state: NegotiationState::AnswerSent,
    }));
    assert!(!seen.iter().any(|e| matches!(
        e,
        SessionEvent::NegotiationChanged {
            state: NegotiationState::OfferSent,
            ..
        }
    )));

    assert_eq!(mesh.network.restart_offers(&p1.id, &p2.id), 0);

    h1.leave().await;
    h2.leave().await;
}
