use crate::room::member::Member;
use crate::room::presence_hook::PresenceHook;
use crate::room::registry_config::RegistryConfig;
use crate::room::room_command::RoomCommand;
use crate::room::room_registry::RoomRegistry;
use crate::signaling::SignalingOutput;
use huddle_core::{PeerId, RoomId, SignalMessage, SignalPayload};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Actor owning the membership of one room. All membership changes and
/// fan-out for the room go through its command queue, so they are
/// serialized per room.
pub struct Room {
    room_id: RoomId,
    /// Identifies this actor in the registry, so a replacement room with the
    /// same id is never removed by an old one shutting down.
    instance: u64,
    /// Members in join order.
    members: Vec<Member>,
    command_rx: mpsc::Receiver<RoomCommand>,
    /// Used by grace timers; weak so timers never keep the room alive.
    command_tx: mpsc::WeakSender<RoomCommand>,
    signaling: Arc<dyn SignalingOutput>,
    hook: Arc<dyn PresenceHook>,
    registry: RoomRegistry,
    config: RegistryConfig,
    closed: bool,
}

impl Room {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        room_id: RoomId,
        instance: u64,
        command_rx: mpsc::Receiver<RoomCommand>,
        command_tx: mpsc::WeakSender<RoomCommand>,
        signaling: Arc<dyn SignalingOutput>,
        hook: Arc<dyn PresenceHook>,
        registry: RoomRegistry,
        config: RegistryConfig,
    ) -> Self {
        Self {
            room_id,
            instance,
            members: Vec::new(),
            command_rx,
            command_tx,
            signaling,
            hook,
            registry,
            config,
            closed: false,
        }
    }

    pub async fn run(mut self) {
        info!("Room {} event loop started", self.room_id);

        while let Some(cmd) = self.command_rx.recv().await {
            self.handle_command(cmd).await;

            if self.closed || self.members.is_empty() {
                break;
            }
        }

        self.shutdown().await;
        info!("Room {} event loop finished", self.room_id);
    }

    async fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join { peer_id, epoch } => self.join(peer_id, epoch).await,

            RoomCommand::Leave { peer_id } => self.remove_member(&peer_id).await,

            RoomCommand::Relay(msg) => self.relay(msg).await,

            RoomCommand::Detach {
                peer_id,
                epoch,
                undelivered,
            } => self.detach(peer_id, epoch, undelivered).await,

            RoomCommand::GraceExpired { peer_id, epoch } => {
                let expired = self
                    .member(&peer_id)
                    .is_some_and(|m| m.epoch == epoch && !m.is_connected());
                if expired {
                    info!(
                        "Grace window expired for {} in room {}",
                        peer_id, self.room_id
                    );
                    self.remove_member(&peer_id).await;
                }
            }

            RoomCommand::Members { reply } => {
                let _ = reply.send(self.members.iter().map(|m| m.peer_id.clone()).collect());
            }

            RoomCommand::Close => {
                info!("Closing room {}", self.room_id);
                for peer_id in self.member_ids() {
                    let msg = self.relay_message(SignalPayload::RoomClosed);
                    self.deliver(&peer_id, msg).await;
                }
                self.members.clear();
                self.hook.on_room_closed(&self.room_id).await;
                self.closed = true;
            }
        }
    }

    async fn join(&mut self, peer_id: PeerId, epoch: u64) {
        let others: Vec<PeerId> = self
            .members
            .iter()
            .filter(|m| m.peer_id != peer_id)
            .map(|m| m.peer_id.clone())
            .collect();

        if let Some(member) = self.member_mut(&peer_id) {
            let backlog = member.resume(epoch);
            debug!(
                "Resuming {} in room {} with {} buffered messages",
                peer_id,
                self.room_id,
                backlog.len()
            );

            let welcome = self.relay_message(SignalPayload::Welcome {
                peers: others,
                resumed: true,
            });
            self.deliver(&peer_id, welcome).await;
            for msg in backlog {
                self.deliver(&peer_id, msg).await;
            }

            self.hook.on_resume(&self.room_id, &peer_id).await;
            return;
        }

        self.members.push(Member::new(peer_id.clone(), epoch));

        let welcome = self.relay_message(SignalPayload::Welcome {
            peers: others.clone(),
            resumed: false,
        });
        self.deliver(&peer_id, welcome).await;

        for other in others {
            let msg = SignalMessage::new(self.room_id.clone(), peer_id.clone(), SignalPayload::Join);
            self.deliver(&other, msg).await;
        }

        self.hook.on_join(&self.room_id, &peer_id).await;
    }

    async fn relay(&mut self, msg: SignalMessage) {
        if self.member(&msg.sender_id).is_none() {
            warn!(
                "Dropping {} from non-member {} in room {}",
                msg.payload.name(),
                msg.sender_id,
                self.room_id
            );
            return;
        }

        match msg.target_id.clone() {
            Some(target) => {
                if self.member(&target).is_none() {
                    debug!(
                        "Dropping {} for departed peer {} in room {}",
                        msg.payload.name(),
                        target,
                        self.room_id
                    );
                    return;
                }
                self.deliver(&target, msg).await;
            }
            None => {
                for other in self.member_ids() {
                    if other != msg.sender_id {
                        self.deliver(&other, msg.clone()).await;
                    }
                }
            }
        }
    }

    async fn detach(&mut self, peer_id: PeerId, epoch: u64, undelivered: Vec<SignalMessage>) {
        let grace_window = self.config.grace_window;
        let backlog_limit = self.config.backlog_limit;
        let weak_tx = self.command_tx.clone();
        let room_id = self.room_id.clone();

        let Some(member) = self.member_mut(&peer_id) else {
            return;
        };
        if member.epoch != epoch || !member.is_connected() {
            debug!("Ignoring stale detach of {} (epoch {})", peer_id, epoch);
            // The peer is reachable again or already holding a backlog.
            for msg in undelivered {
                self.deliver(&peer_id, msg).await;
            }
            return;
        }
        member.requeue(undelivered, backlog_limit);

        info!(
            "Peer {} lost its connection to room {}, holding for {:?}",
            peer_id, room_id, grace_window
        );

        let timer_peer = peer_id.clone();
        let grace = tokio::spawn(async move {
            tokio::time::sleep(grace_window).await;
            let Some(tx) = weak_tx.upgrade() else {
                return;
            };
            let _ = tx
                .send(RoomCommand::GraceExpired {
                    peer_id: timer_peer,
                    epoch,
                })
                .await;
        });
        member.suspend(grace);
    }

    async fn remove_member(&mut self, peer_id: &PeerId) {
        let Some(index) = self.members.iter().position(|m| &m.peer_id == peer_id) else {
            return;
        };
        self.members.remove(index);

        for other in self.member_ids() {
            let msg = SignalMessage::new(self.room_id.clone(), peer_id.clone(), SignalPayload::Leave);
            self.deliver(&other, msg).await;
        }

        self.hook.on_leave(&self.room_id, peer_id).await;
    }

    /// Sends to a member, holding the message if the member is unreachable.
    async fn deliver(&mut self, peer_id: &PeerId, msg: SignalMessage) {
        let limit = self.config.backlog_limit;
        let Some(member) = self.members.iter_mut().find(|m| &m.peer_id == peer_id) else {
            return;
        };

        if member.is_connected()
            && self
                .signaling
                .deliver(&self.room_id, peer_id, msg.clone())
                .await
        {
            return;
        }
        member.buffer(msg, limit);
    }

    async fn shutdown(&mut self) {
        self.registry.forget(&self.room_id, self.instance);
        self.command_rx.close();

        let mut stray = Vec::new();
        while let Ok(cmd) = self.command_rx.try_recv() {
            stray.push(cmd);
        }

        for cmd in stray {
            match cmd {
                RoomCommand::Join { .. } => self.registry.dispatch(&self.room_id, cmd).await,
                RoomCommand::Members { reply } => {
                    let _ = reply.send(Vec::new());
                }
                other => debug!("Room {} dropping {:?} after shutdown", self.room_id, other),
            }
        }
    }

    /// Message originated by the relay itself rather than by a member.
    fn relay_message(&self, payload: SignalPayload) -> SignalMessage {
        SignalMessage::new(self.room_id.clone(), PeerId::from(""), payload)
    }

    fn member(&self, peer_id: &PeerId) -> Option<&Member> {
        self.members.iter().find(|m| &m.peer_id == peer_id)
    }

    fn member_mut(&mut self, peer_id: &PeerId) -> Option<&mut Member> {
        self.members.iter_mut().find(|m| &m.peer_id == peer_id)
    }

    fn member_ids(&self) -> Vec<PeerId> {
        self.members.iter().map(|m| m.peer_id.clone()).collect()
    }
}
