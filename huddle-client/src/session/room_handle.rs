use crate::error::SessionError;
use crate::session::session_command::SessionCommand;
use crate::session::{SessionEvents, SessionSnapshot};
use huddle_core::{PeerId, RoomId};
use tokio::sync::{mpsc, oneshot, watch};

/// Control surface of a joined room. Cheap to clone; the room is left when
/// `leave` is called or the last handle is dropped.
#[derive(Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    local_peer_id: PeerId,
    commands: mpsc::Sender<SessionCommand>,
    snapshot: watch::Receiver<SessionSnapshot>,
}

impl RoomHandle {
    pub(crate) fn new(
        room_id: RoomId,
        local_peer_id: PeerId,
        commands: mpsc::Sender<SessionCommand>,
        snapshot: watch::Receiver<SessionSnapshot>,
    ) -> Self {
        Self {
            room_id,
            local_peer_id,
            commands,
            snapshot,
        }
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn local_peer_id(&self) -> &PeerId {
        &self.local_peer_id
    }

    /// Leaves the room and waits until every resource is released. Calling
    /// it again, from any clone, does nothing.
    pub async fn leave(&self) {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(SessionCommand::Leave { reply }).await.is_ok() {
            let _ = rx.await;
        }
    }

    /// Flips the outgoing video track without renegotiating.
    pub async fn set_local_video_enabled(&self, enabled: bool) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.request(SessionCommand::SetVideoEnabled { enabled, reply })
            .await?;
        rx.await.map_err(|_| SessionError::Left)
    }

    pub async fn set_local_audio_enabled(&self, enabled: bool) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.request(SessionCommand::SetAudioEnabled { enabled, reply })
            .await?;
        rx.await.map_err(|_| SessionError::Left)
    }

    /// Switches the outgoing video between camera and screen for every peer.
    /// Fails with `CaptureDenied` if no screen can be captured, leaving the
    /// camera in place.
    pub async fn set_screen_share(&self, enabled: bool) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.request(SessionCommand::SetScreenShare { enabled, reply })
            .await?;
        rx.await.map_err(|_| SessionError::Left)?
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    /// A new event subscription starting at the next event.
    pub async fn subscribe(&self) -> SessionEvents {
        let (reply, rx) = oneshot::channel();
        if self.request(SessionCommand::Subscribe { reply }).await.is_err() {
            return SessionEvents::ended();
        }
        match rx.await {
            Ok(events) => SessionEvents::new(events),
            Err(_) => SessionEvents::ended(),
        }
    }

    async fn request(&self, cmd: SessionCommand) -> Result<(), SessionError> {
        self.commands.send(cmd).await.map_err(|_| SessionError::Left)
    }
}
