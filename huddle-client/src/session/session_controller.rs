use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::media::{DeviceKind, LocalMediaController, MediaBackend};
use crate::session::room_session::RoomSession;
use crate::session::{RoomHandle, SessionEvents, SessionSnapshot};
use crate::signaling::{SignalingChannel, SignalingConnector};
use crate::transport::TransportFactory;
use huddle_core::{PeerId, RoomId};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{info, warn};

/// Entry point for joining rooms as one local participant.
pub struct SessionController {
    config: SessionConfig,
    backend: Arc<dyn MediaBackend>,
    connector: Arc<dyn SignalingConnector>,
    factory: Arc<dyn TransportFactory>,
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        backend: Arc<dyn MediaBackend>,
        connector: Arc<dyn SignalingConnector>,
        factory: Arc<dyn TransportFactory>,
    ) -> Self {
        Self {
            config,
            backend,
            connector,
            factory,
        }
    }

    pub fn local_peer_id(&self) -> &PeerId {
        &self.config.local_peer_id
    }

    /// Opens camera and microphone, connects to the relay and announces the
    /// participant. Either everything succeeds or nothing stays acquired.
    pub async fn join(&self, room_id: RoomId) -> Result<(RoomHandle, SessionEvents), SessionError> {
        let local_id = self.config.local_peer_id.clone();
        info!("{} joining room {}", local_id, room_id);

        let mut media = LocalMediaController::new(self.backend.clone());
        for kind in [DeviceKind::Camera, DeviceKind::Microphone] {
            if let Err(e) = media.acquire(kind).await {
                warn!("Join of {} aborted: {}", room_id, e);
                media.release_all().await;
                return Err(SessionError::MediaUnavailable(e));
            }
        }

        let (channel, channel_events) = match SignalingChannel::open(
            self.connector.clone(),
            room_id.clone(),
            local_id.clone(),
            self.config.backoff.clone(),
        )
        .await
        {
            Ok(opened) => opened,
            Err(e) => {
                warn!("Join of {} aborted: {}", room_id, e);
                media.release_all().await;
                return Err(e);
            }
        };

        let (command_tx, command_rx) = mpsc::channel(self.config.command_buffer);
        let (events_tx, events_rx) = broadcast::channel(self.config.event_capacity);
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::new(
            room_id.clone(),
            local_id.clone(),
            media.snapshot(),
        ));

        let session = RoomSession::new(
            room_id.clone(),
            self.config.clone(),
            media,
            channel,
            channel_events,
            self.factory.clone(),
            command_rx,
            snapshot_tx,
            events_tx,
        );
        tokio::spawn(session.run());

        Ok((
            RoomHandle::new(room_id, local_id, command_tx, snapshot_rx),
            SessionEvents::new(events_rx),
        ))
    }
}
