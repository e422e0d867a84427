//! Integration tests for huddle-client.
//!
//! Participants run real sessions against an in-process relay and a fake
//! media network:
//! - `session_tests` - join, leave and two-party negotiation
//! - `media_tests` - mute and screen share
//! - `signaling_tests` - relay outages and room closure
//! - `health_tests` - ICE restart and peer timeout

pub mod health_tests;
pub mod media_tests;

use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

use huddle_client::media::SyntheticMediaBackend;
use huddle_client::{
    RoomHandle, SessionConfig, SessionController, SessionEvent, SessionEvents, SessionSnapshot,
};
use huddle_core::{ConnectionStatus, HealthState, NegotiationState, PeerId, RoomId};
use huddle_server::{LogPresence, RegistryConfig, SignalingService};

use crate::utils::{FakeNetwork, RelayConnector};

const WAIT: Duration = Duration::from_secs(60);

/// Initialize tracing for tests (call once per test).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// A relay, a media network and one room shared by every participant.
pub struct TestMesh {
    pub service: SignalingService,
    pub connector: RelayConnector,
    pub network: FakeNetwork,
    pub room_id: RoomId,
}

/// One local participant with its own capture devices.
pub struct Participant {
    pub id: PeerId,
    pub backend: SyntheticMediaBackend,
    pub controller: SessionController,
}

impl Participant {
    pub async fn join(&self, mesh: &TestMesh) -> (RoomHandle, SessionEvents) {
        self.controller
            .join(mesh.room_id.clone())
            .await
            .unwrap_or_else(|e| panic!("{} failed to join: {}", self.id, e))
    }
}

pub fn create_mesh() -> TestMesh {
    create_mesh_with(RegistryConfig::default())
}

pub fn create_mesh_with(config: RegistryConfig) -> TestMesh {
    let service = SignalingService::new(config, Vec::new(), Arc::new(LogPresence));

    TestMesh {
        connector: RelayConnector::new(service.clone()),
        service,
        network: FakeNetwork::new(),
        room_id: RoomId::from("r1"),
    }
}

impl TestMesh {
    pub fn participant(&self, id: &str) -> Participant {
        let id = PeerId::from(id);
        let backend = SyntheticMediaBackend::new();
        let controller = SessionController::new(
            SessionConfig::new(id.clone()),
            Arc::new(backend.clone()),
            Arc::new(self.connector.clone()),
            Arc::new(self.network.clone()),
        );

        Participant {
            id,
            backend,
            controller,
        }
    }
}

/// Waits until the published snapshot satisfies `pred`.
pub async fn wait_for_snapshot(
    handle: &RoomHandle,
    pred: impl FnMut(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    let mut watch = handle.watch();
    let snapshot = tokio::time::timeout(WAIT, watch.wait_for(pred))
        .await
        .expect("timed out waiting for snapshot")
        .expect("session dropped its snapshot");
    snapshot.clone()
}

/// Both sides of a pair negotiated and connected.
pub fn is_linked(snapshot: &SessionSnapshot, peer_id: &PeerId) -> bool {
    snapshot.peer(peer_id).is_some_and(|p| {
        p.negotiation == NegotiationState::Stable && p.health == HealthState::Connected
    })
}

pub async fn wait_linked(handle: &RoomHandle, peer_id: &PeerId) -> SessionSnapshot {
    wait_for_snapshot(handle, |s| {
        is_linked(s, peer_id) && s.status == ConnectionStatus::Connected
    })
    .await
}

/// Collects events up to and including the first one matching `pred`.
pub async fn collect_until(
    events: &mut SessionEvents,
    mut pred: impl FnMut(&SessionEvent) -> bool,
) -> Vec<SessionEvent> {
    let mut seen = Vec::new();
    let found = tokio::time::timeout(WAIT, async {
        while let Some(event) = events.next().await {
            let done = pred(&event);
            seen.push(event);
            if done {
                return true;
            }
        }
        false
    })
    .await;

    match found {
        Ok(true) => seen,
        Ok(false) => panic!("event stream ended first; saw {:?}", seen),
        Err(_) => panic!("timed out waiting for event; saw {:?}", seen),
    }
}

/// Everything already buffered on the stream.
pub fn drain(events: &mut SessionEvents) -> Vec<SessionEvent> {
    std::iter::from_fn(|| events.try_next()).collect()
}
