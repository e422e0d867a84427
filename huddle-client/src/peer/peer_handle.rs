use crate::config::HealthPolicy;
use crate::media::LocalTrack;
use crate::peer::supervisor::PeerSupervisor;
use crate::peer::{PeerCommand, PeerEvent};
use crate::signaling::SignalSender;
use crate::transport::{TransportConfig, TransportFactory};
use huddle_core::{PeerId, SignalPayload};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Everything a supervisor needs to start.
pub struct SupervisorContext {
    pub local_id: PeerId,
    pub remote_id: PeerId,
    pub generation: u64,
    pub factory: Arc<dyn TransportFactory>,
    pub transport_config: TransportConfig,
    pub signal: SignalSender,
    pub policy: HealthPolicy,
    pub audio: Option<Arc<LocalTrack>>,
    pub video: Option<Arc<LocalTrack>>,
    pub events: mpsc::UnboundedSender<PeerEvent>,
}

/// Owner side of a running supervisor task.
pub struct PeerHandle {
    peer_id: PeerId,
    generation: u64,
    commands: mpsc::UnboundedSender<PeerCommand>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PeerHandle {
    /// Starts a supervisor that stops when `cancel` (or a parent of it) fires.
    pub fn spawn(ctx: SupervisorContext, cancel: CancellationToken) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let peer_id = ctx.remote_id.clone();
        let generation = ctx.generation;

        let task = tokio::spawn(PeerSupervisor::run(ctx, command_rx, cancel.clone()));

        Self {
            peer_id,
            generation,
            commands,
            cancel,
            task,
        }
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn signal(&self, payload: SignalPayload) -> bool {
        self.commands.send(PeerCommand::Signal(payload)).is_ok()
    }

    pub fn replace_video(&self, track: Option<Arc<LocalTrack>>) -> bool {
        self.commands.send(PeerCommand::ReplaceVideo(track)).is_ok()
    }

    pub fn signaling_up(&self, up: bool) -> bool {
        self.commands.send(PeerCommand::SignalingUp(up)).is_ok()
    }

    /// Cancels the supervisor and waits until its transport is closed.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!("Supervisor for {} ended abnormally: {}", self.peer_id, e);
        }
    }
}
