use crate::config::SessionConfig;
use crate::error::{MediaError, SessionError};
use crate::health::aggregate_status;
use crate::media::{CaptureDevice, DeviceKind, LocalMediaController, LocalTrack};
use crate::peer::{PeerEvent, PeerEventKind, PeerHandle, SupervisorContext};
use crate::session::peer_session::PeerSession;
use crate::session::session_command::SessionCommand;
use crate::session::{PeerLeftReason, SessionEvent, SessionSnapshot};
use crate::signaling::{ChannelEvent, SignalSender, SignalingChannel};
use crate::transport::{TransportConfig, TransportFactory};
use huddle_core::{ConnectionStatus, IceServerConfig, PeerId, RoomId, SignalMessage, SignalPayload};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Why the actor loop stopped.
struct Exit {
    error: Option<SessionError>,
    reply: Option<oneshot::Sender<()>>,
}

type ShareReply = oneshot::Sender<Result<(), SessionError>>;

/// A screen acquisition in flight. It runs beside the actor loop, since a
/// picker can stay open for as long as the user likes.
struct ScreenRequest {
    task: JoinHandle<Option<Result<CaptureDevice, MediaError>>>,
    cancel: CancellationToken,
    waiters: Vec<ShareReply>,
}

/// Root task of a joined room. Owns local media, the signaling channel and
/// one `PeerSession` per remote peer; every change goes through its loop.
pub(crate) struct RoomSession {
    room_id: RoomId,
    local_id: PeerId,
    config: SessionConfig,
    media: LocalMediaController,
    media_ended: broadcast::Receiver<CaptureDevice>,
    screen_request: Option<ScreenRequest>,
    channel: Option<SignalingChannel>,
    signal: SignalSender,
    channel_events: mpsc::UnboundedReceiver<ChannelEvent>,
    factory: Arc<dyn TransportFactory>,
    ice_servers: Vec<IceServerConfig>,
    peers: BTreeMap<PeerId, PeerSession>,
    next_generation: u64,
    peer_events_tx: mpsc::UnboundedSender<PeerEvent>,
    peer_events_rx: mpsc::UnboundedReceiver<PeerEvent>,
    commands: mpsc::Receiver<SessionCommand>,
    snapshot: watch::Sender<SessionSnapshot>,
    events: broadcast::Sender<SessionEvent>,
    /// Parent of every supervisor's token.
    cancel: CancellationToken,
    signaling_up: bool,
    welcomed: bool,
    /// Set between a reconnect and the relay's welcome.
    restoring: bool,
    status: ConnectionStatus,
}

impl RoomSession {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        room_id: RoomId,
        config: SessionConfig,
        media: LocalMediaController,
        channel: SignalingChannel,
        channel_events: mpsc::UnboundedReceiver<ChannelEvent>,
        factory: Arc<dyn TransportFactory>,
        commands: mpsc::Receiver<SessionCommand>,
        snapshot: watch::Sender<SessionSnapshot>,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        let (peer_events_tx, peer_events_rx) = mpsc::unbounded_channel();
        Self {
            room_id,
            local_id: config.local_peer_id.clone(),
            ice_servers: config.ice_servers.clone(),
            config,
            media_ended: media.ended_devices(),
            screen_request: None,
            media,
            signal: channel.sender(),
            channel: Some(channel),
            channel_events,
            factory,
            peers: BTreeMap::new(),
            next_generation: 1,
            peer_events_tx,
            peer_events_rx,
            commands,
            snapshot,
            events,
            cancel: CancellationToken::new(),
            signaling_up: true,
            welcomed: false,
            restoring: false,
            status: ConnectionStatus::Connecting,
        }
    }

    pub(crate) async fn run(mut self) {
        info!("Session for {} in room {} started", self.local_id, self.room_id);

        let exit = loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(SessionCommand::Leave { reply }) => {
                        break Exit { error: None, reply: Some(reply) };
                    }
                    Some(cmd) => self.on_command(cmd).await,
                    None => {
                        debug!("Every handle of {} dropped", self.room_id);
                        break Exit { error: None, reply: None };
                    }
                },

                Some(event) = self.channel_events.recv() => {
                    if let Some(error) = self.on_channel_event(event).await {
                        break Exit { error: Some(error), reply: None };
                    }
                }

                Some(event) = self.peer_events_rx.recv() => self.on_peer_event(event).await,

                outcome = screen_acquired(&mut self.screen_request) => {
                    self.finish_screen_request(outcome).await;
                }

                Ok(device) = self.media_ended.recv() => self.on_device_ended(device).await,
            }

            self.publish();
        };

        self.teardown(exit.error).await;
        if let Some(reply) = exit.reply {
            let _ = reply.send(());
        }

        // Later leave calls find the queue closed and return at once.
        self.commands.close();
        info!("Session for {} in room {} finished", self.local_id, self.room_id);
    }

    async fn on_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::SetAudioEnabled { enabled, reply } => {
                self.media.set_audio_enabled(enabled);
                self.announce_media_state();
                let _ = reply.send(());
            }
            SessionCommand::SetVideoEnabled { enabled, reply } => {
                self.media.set_video_enabled(enabled);
                self.announce_media_state();
                let _ = reply.send(());
            }
            SessionCommand::SetScreenShare {
                enabled: true,
                reply,
            } => self.request_screen(reply),
            SessionCommand::SetScreenShare {
                enabled: false,
                reply,
            } => {
                self.cancel_screen_request(SessionError::CaptureDenied(MediaError::Cancelled(
                    DeviceKind::Screen,
                )))
                .await;
                self.stop_screen_share().await;
                let _ = reply.send(Ok(()));
            }
            SessionCommand::Subscribe { reply } => {
                let _ = reply.send(self.events.subscribe());
            }
            SessionCommand::Leave { .. } => {}
        }
    }

    /// Starts a screen acquisition, or joins the one already running.
    fn request_screen(&mut self, reply: ShareReply) {
        if self.media.is_screen_sharing() {
            let _ = reply.send(Ok(()));
            return;
        }
        if let Some(request) = self.screen_request.as_mut() {
            request.waiters.push(reply);
            return;
        }

        debug!("{} requesting a screen source", self.local_id);
        let cancel = self.cancel.child_token();
        let open = self.media.open_screen();
        let task = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    result = open => Some(result),
                }
            }
        });

        self.screen_request = Some(ScreenRequest {
            task,
            cancel,
            waiters: vec![reply],
        });
    }

    /// Applies a finished acquisition. The switch happens inside the actor,
    /// so a peer added before it starts on the camera and one added after
    /// starts on the screen.
    async fn finish_screen_request(&mut self, outcome: Option<Result<CaptureDevice, MediaError>>) {
        let Some(request) = self.screen_request.take() else {
            return;
        };

        let result = match outcome {
            Some(Ok(device)) => {
                let screen = self.media.adopt_screen(device).await;
                self.switch_video(Some(screen));
                Ok(())
            }
            Some(Err(e)) => {
                warn!("{} could not share a screen: {}", self.local_id, e);
                Err(SessionError::CaptureDenied(e))
            }
            None => Err(SessionError::CaptureDenied(MediaError::Cancelled(
                DeviceKind::Screen,
            ))),
        };
        for waiter in request.waiters {
            let _ = waiter.send(result.clone());
        }
    }

    /// Withdraws a running acquisition. A screen granted in the meantime is
    /// stopped again.
    async fn cancel_screen_request(&mut self, error: SessionError) {
        let Some(request) = self.screen_request.take() else {
            return;
        };
        debug!("{} withdrawing its screen request", self.local_id);

        request.cancel.cancel();
        if let Ok(Some(Ok(device))) = request.task.await {
            self.media.discard(&device).await;
        }
        for waiter in request.waiters {
            let _ = waiter.send(Err(error.clone()));
        }
    }

    async fn stop_screen_share(&mut self) {
        if !self.media.is_screen_sharing() {
            return;
        }
        let video = self.media.stop_screen_share().await;
        self.switch_video(video);
    }

    fn switch_video(&mut self, video: Option<Arc<LocalTrack>>) {
        info!(
            "{} switched outgoing video to {}",
            self.local_id,
            video.as_ref().map(|t| t.kind().as_str()).unwrap_or("none")
        );
        for session in self.peers.values() {
            session.handle.replace_video(video.clone());
        }
        self.emit(SessionEvent::LocalMediaChanged(self.media.snapshot()));
    }

    /// A held device was stopped by the platform rather than by us.
    async fn on_device_ended(&mut self, device: CaptureDevice) {
        if !self.media.holds(&device) {
            debug!("Ignoring end of {} not held", device.kind);
            return;
        }
        warn!("{} of {} ended outside the session", device.kind, self.local_id);

        match device.kind {
            DeviceKind::Screen => self.stop_screen_share().await,
            DeviceKind::Camera => {
                self.media.release(DeviceKind::Camera).await;
                self.switch_video(None);
            }
            DeviceKind::Microphone => {
                self.media.release(DeviceKind::Microphone).await;
                self.emit(SessionEvent::LocalMediaChanged(self.media.snapshot()));
            }
        }
    }

    fn notify_signaling(&self, up: bool) {
        for session in self.peers.values() {
            session.handle.signaling_up(up);
        }
    }

    fn announce_media_state(&mut self) {
        let state = self.media.snapshot();
        self.signal.send(
            SignalPayload::MediaState {
                audio_enabled: state.audio_enabled,
                video_enabled: state.video_enabled,
            },
            None,
        );
        self.emit(SessionEvent::LocalMediaChanged(state));
    }

    async fn on_channel_event(&mut self, event: ChannelEvent) -> Option<SessionError> {
        match event {
            ChannelEvent::Message(msg) => return self.on_signal(msg).await,
            ChannelEvent::Interrupted => {
                self.signaling_up = false;
                self.notify_signaling(false);
                self.emit(SessionEvent::SignalingInterrupted);
            }
            ChannelEvent::Restored => {
                self.signaling_up = true;
                self.restoring = true;
                self.notify_signaling(true);
            }
            ChannelEvent::Closed => {
                return Some(SessionError::SignalingUnavailable(
                    "signaling channel closed".to_string(),
                ));
            }
        }
        self.refresh_status();
        None
    }

    async fn on_signal(&mut self, msg: SignalMessage) -> Option<SessionError> {
        let sender = msg.sender_id;
        match msg.payload {
            SignalPayload::Welcome { peers, resumed } => self.on_welcome(peers, resumed).await,
            SignalPayload::IceConfig { ice_servers } => {
                for server in ice_servers {
                    if !self.ice_servers.contains(&server) {
                        self.ice_servers.push(server);
                    }
                }
            }
            SignalPayload::RoomClosed => return Some(SessionError::RoomClosed),
            SignalPayload::Join if sender != self.local_id => {
                if self.peers.contains_key(&sender) {
                    self.remove_session(&sender, PeerLeftReason::Replaced).await;
                }
                self.add_session(sender);
            }
            SignalPayload::Leave => self.remove_session(&sender, PeerLeftReason::Left).await,
            SignalPayload::Join => {}
            payload => match self.peers.get(&sender) {
                Some(session) => {
                    session.handle.signal(payload);
                }
                None => debug!("Ignoring {} from unknown peer {}", payload.name(), sender),
            },
        }
        self.refresh_status();
        None
    }

    /// Brings the peer set in line with the relay's member list.
    async fn on_welcome(&mut self, peers: Vec<PeerId>, resumed: bool) {
        if std::mem::take(&mut self.restoring) {
            self.emit(SessionEvent::SignalingRestored { resumed });
        }

        let listed: BTreeSet<PeerId> = peers
            .into_iter()
            .filter(|p| p != &self.local_id)
            .collect();

        let stale: Vec<(PeerId, PeerLeftReason)> = self
            .peers
            .keys()
            .filter(|p| !resumed || !listed.contains(*p))
            .map(|p| {
                let reason = if listed.contains(p) {
                    PeerLeftReason::Replaced
                } else {
                    PeerLeftReason::Left
                };
                (p.clone(), reason)
            })
            .collect();
        for (peer_id, reason) in stale {
            self.remove_session(&peer_id, reason).await;
        }

        for peer_id in listed {
            if !self.peers.contains_key(&peer_id) {
                self.add_session(peer_id);
            }
        }
        self.welcomed = true;
    }

    fn add_session(&mut self, peer_id: PeerId) {
        let generation = self.next_generation;
        self.next_generation += 1;

        let ctx = SupervisorContext {
            local_id: self.local_id.clone(),
            remote_id: peer_id.clone(),
            generation,
            factory: self.factory.clone(),
            transport_config: TransportConfig {
                ice_servers: self.ice_servers.clone(),
            },
            signal: self.signal.clone(),
            policy: self.config.health.clone(),
            audio: self.media.audio_track(),
            video: self.media.outgoing_video(),
            events: self.peer_events_tx.clone(),
        };
        let handle = PeerHandle::spawn(ctx, self.cancel.child_token());
        self.peers.insert(peer_id.clone(), PeerSession::new(handle));
        info!("Peer {} joined room {}", peer_id, self.room_id);
        self.emit(SessionEvent::PeerJoined {
            peer_id: peer_id.clone(),
        });

        let state = self.media.snapshot();
        self.signal.send(
            SignalPayload::MediaState {
                audio_enabled: state.audio_enabled,
                video_enabled: state.video_enabled,
            },
            Some(&peer_id),
        );
    }

    async fn remove_session(&mut self, peer_id: &PeerId, reason: PeerLeftReason) {
        let Some(session) = self.peers.remove(peer_id) else {
            return;
        };
        info!("Peer {} left room {}: {:?}", peer_id, self.room_id, reason);

        for kind in session.tracks.iter().copied() {
            self.emit(SessionEvent::TrackRemoved {
                peer_id: peer_id.clone(),
                kind,
            });
        }
        self.emit(SessionEvent::PeerLeft {
            peer_id: peer_id.clone(),
            reason,
        });
        session.handle.shutdown().await;
    }

    async fn on_peer_event(&mut self, event: PeerEvent) {
        let Some(session) = self.peers.get_mut(&event.peer_id) else {
            return;
        };
        if session.handle.generation() != event.generation {
            debug!(
                "Dropping event from replaced supervisor of {} (generation {})",
                event.peer_id, event.generation
            );
            return;
        }

        let peer_id = event.peer_id;
        let out = match event.kind {
            PeerEventKind::NegotiationChanged(state) => {
                session.negotiation = state;
                SessionEvent::NegotiationChanged { peer_id, state }
            }
            PeerEventKind::HealthChanged(state) => {
                session.health = state;
                SessionEvent::HealthChanged { peer_id, state }
            }
            PeerEventKind::TrackAdded(kind) => {
                if !session.tracks.insert(kind) {
                    return;
                }
                SessionEvent::TrackAdded { peer_id, kind }
            }
            PeerEventKind::TrackRemoved(kind) => {
                if !session.tracks.remove(&kind) {
                    return;
                }
                SessionEvent::TrackRemoved { peer_id, kind }
            }
            PeerEventKind::RemoteMediaState {
                audio_enabled,
                video_enabled,
            } => SessionEvent::RemoteMediaState {
                peer_id,
                audio_enabled,
                video_enabled,
            },
            PeerEventKind::Failed(error) => {
                warn!("Connection to {} failed: {}", peer_id, error);
                self.remove_session(&peer_id, PeerLeftReason::Failed(error))
                    .await;
                self.refresh_status();
                return;
            }
        };

        self.emit(out);
        self.refresh_status();
    }

    /// Releases everything the session holds, then reports termination.
    async fn teardown(&mut self, error: Option<SessionError>) {
        match &error {
            Some(e) => warn!("Session in room {} ending: {}", self.room_id, e),
            None => info!("{} leaving room {}", self.local_id, self.room_id),
        }

        self.cancel_screen_request(SessionError::Left).await;
        self.cancel.cancel();
        let peer_ids: Vec<PeerId> = self.peers.keys().cloned().collect();
        for peer_id in peer_ids {
            self.remove_session(&peer_id, PeerLeftReason::SessionEnded)
                .await;
        }

        self.media.release_all().await;
        if let Some(channel) = self.channel.take() {
            channel.close().await;
        }

        self.signaling_up = false;
        self.set_status(ConnectionStatus::Disconnected);
        self.publish_with(|snapshot| snapshot.active = false);
        self.emit(SessionEvent::Terminated { error });
    }

    fn refresh_status(&mut self) {
        let status = if !self.welcomed && self.signaling_up {
            ConnectionStatus::Connecting
        } else {
            aggregate_status(self.peers.values().map(|s| s.health), self.signaling_up)
        };
        self.set_status(status);
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        if status != self.status {
            debug!("Room {} status {:?} -> {:?}", self.room_id, self.status, status);
            self.status = status;
            self.emit(SessionEvent::StatusChanged(status));
        }
    }

    fn publish(&self) {
        self.publish_with(|_| {});
    }

    fn publish_with(&self, adjust: impl FnOnce(&mut SessionSnapshot)) {
        let mut snapshot = SessionSnapshot {
            room_id: self.room_id.clone(),
            local_peer_id: self.local_id.clone(),
            status: self.status,
            signaling_up: self.signaling_up,
            media: self.media.snapshot(),
            peers: self.peers.values().map(|s| s.snapshot()).collect(),
            active: true,
        };
        adjust(&mut snapshot);
        self.snapshot.send_replace(snapshot);
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

/// Resolves once the running screen request finishes; never without one.
async fn screen_acquired(
    request: &mut Option<ScreenRequest>,
) -> Option<Result<CaptureDevice, MediaError>> {
    let Some(request) = request.as_mut() else {
        return std::future::pending().await;
    };
    match (&mut request.task).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("Screen request task failed: {}", e);
            None
        }
    }
}
