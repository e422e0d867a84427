use crate::room::{PresenceHook, RegistryConfig, Room, RoomCommand};
use crate::signaling::SignalingOutput;
use dashmap::DashMap;
use huddle_core::{PeerId, RoomId};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, oneshot};
use tracing::info;

#[derive(Clone)]
struct RoomEntry {
    instance: u64,
    tx: mpsc::Sender<RoomCommand>,
}

struct RegistryInner {
    rooms: DashMap<RoomId, RoomEntry>,
    next_instance: AtomicU64,
    signaling: Arc<dyn SignalingOutput>,
    hook: Arc<dyn PresenceHook>,
    config: RegistryConfig,
}

/// Maps room ids to running room actors. Rooms are created on first use and
/// remove themselves once their last member is gone.
#[derive(Clone)]
pub struct RoomRegistry {
    inner: Arc<RegistryInner>,
}

impl RoomRegistry {
    pub fn new(
        config: RegistryConfig,
        signaling: Arc<dyn SignalingOutput>,
        hook: Arc<dyn PresenceHook>,
    ) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                rooms: DashMap::new(),
                next_instance: AtomicU64::new(1),
                signaling,
                hook,
                config,
            }),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    /// Hands a command to the room, starting the room if needed.
    pub async fn dispatch(&self, room_id: &RoomId, mut cmd: RoomCommand) {
        loop {
            let entry = self.room_entry(room_id);
            match entry.tx.send(cmd).await {
                Ok(()) => return,
                Err(mpsc::error::SendError(returned)) => {
                    // The room shut down between lookup and send.
                    self.forget(room_id, entry.instance);
                    cmd = returned;
                }
            }
        }
    }

    /// Current members of a room in join order; empty for unknown rooms.
    pub async fn members(&self, room_id: &RoomId) -> Vec<PeerId> {
        let Some(tx) = self.inner.rooms.get(room_id).map(|e| e.tx.clone()) else {
            return Vec::new();
        };

        let (reply, rx) = oneshot::channel();
        if tx.send(RoomCommand::Members { reply }).await.is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    /// Closes a room on behalf of the registry, e.g. when the channel backing
    /// it was deleted.
    pub async fn close_room(&self, room_id: &RoomId) {
        let Some(tx) = self.inner.rooms.get(room_id).map(|e| e.tx.clone()) else {
            return;
        };
        let _ = tx.send(RoomCommand::Close).await;
    }

    pub fn room_count(&self) -> usize {
        self.inner.rooms.len()
    }

    pub fn contains_room(&self, room_id: &RoomId) -> bool {
        self.inner.rooms.contains_key(room_id)
    }

    pub(crate) fn forget(&self, room_id: &RoomId, instance: u64) {
        self.inner
            .rooms
            .remove_if(room_id, |_, entry| entry.instance == instance);
    }

    fn room_entry(&self, room_id: &RoomId) -> RoomEntry {
        if let Some(entry) = self.inner.rooms.get(room_id) {
            return entry.clone();
        }

        self.inner
            .rooms
            .entry(room_id.clone())
            .or_insert_with(|| self.spawn_room(room_id))
            .clone()
    }

    fn spawn_room(&self, room_id: &RoomId) -> RoomEntry {
        info!("Creating new room: {}", room_id);

        let instance = self.inner.next_instance.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.inner.config.command_buffer);

        let room = Room::new(
            room_id.clone(),
            instance,
            rx,
            tx.downgrade(),
            self.inner.signaling.clone(),
            self.inner.hook.clone(),
            self.clone(),
            self.inner.config.clone(),
        );
        tokio::spawn(room.run());

        RoomEntry { instance, tx }
    }
}
