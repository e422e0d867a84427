use crate::config::HealthPolicy;
use crate::error::SessionError;
use crate::health::{HealthAction, HealthSignal, PeerHealth};
use crate::media::LocalTrack;
use crate::peer::{
    Negotiation, OfferDecision, PeerCommand, PeerEvent, PeerEventKind, SupervisorContext,
};
use crate::signaling::SignalSender;
use crate::transport::{IceCandidate, LinkState, PeerTransport, TransportEvent};
use huddle_core::{NegotiationState, PeerId, SignalPayload, TrackKind};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Our outstanding offer. It goes out again if no answer comes in time.
#[derive(Debug, Clone, Copy)]
struct AwaitedAnswer {
    ice_restart: bool,
    /// Offers sent for this exchange so far.
    attempts: u32,
    /// None while the relay is unreachable.
    deadline: Option<Instant>,
}

/// Task driving the connection to one remote peer: negotiation, trickle ICE,
/// track replacement and health.
pub(crate) struct PeerSupervisor {
    remote_id: PeerId,
    generation: u64,
    transport: Arc<dyn PeerTransport>,
    transport_events: mpsc::UnboundedReceiver<TransportEvent>,
    commands: mpsc::UnboundedReceiver<PeerCommand>,
    signal: SignalSender,
    events: mpsc::UnboundedSender<PeerEvent>,
    cancel: CancellationToken,
    negotiation: Negotiation,
    reported_negotiation: NegotiationState,
    health: PeerHealth,
    policy: HealthPolicy,
    awaiting_answer: Option<AwaitedAnswer>,
    signaling_up: bool,
    /// Sequence number of the last candidate we sent.
    local_seq: u64,
    /// Highest candidate sequence number accepted from the remote.
    remote_seq: u64,
    has_remote_description: bool,
    early_candidates: Vec<IceCandidate>,
    remote_tracks: BTreeSet<TrackKind>,
    video_kind: Option<TrackKind>,
}

impl PeerSupervisor {
    pub(crate) async fn run(
        ctx: SupervisorContext,
        commands: mpsc::UnboundedReceiver<PeerCommand>,
        cancel: CancellationToken,
    ) {
        let remote_id = ctx.remote_id.clone();
        let generation = ctx.generation;
        let events = ctx.events.clone();

        let supervisor = tokio::select! {
            _ = cancel.cancelled() => return,
            built = Self::build(ctx, commands, cancel.clone()) => built,
        };

        match supervisor {
            Ok(supervisor) => supervisor.supervise().await,
            Err(e) => {
                warn!("Could not set up connection to {}: {}", remote_id, e);
                let _ = events.send(PeerEvent {
                    peer_id: remote_id,
                    generation,
                    kind: PeerEventKind::Failed(e),
                });
            }
        }
    }

    async fn build(
        ctx: SupervisorContext,
        commands: mpsc::UnboundedReceiver<PeerCommand>,
        cancel: CancellationToken,
    ) -> Result<Self, SessionError> {
        let (transport_tx, transport_events) = mpsc::unbounded_channel();
        let transport = ctx
            .factory
            .create(
                &ctx.local_id,
                &ctx.remote_id,
                ctx.transport_config,
                transport_tx,
            )
            .await
            .map_err(|e| SessionError::negotiation(&ctx.remote_id, format!("{:#}", e)))?;

        let video_kind = ctx.video.as_ref().map(|t| t.kind());
        for track in ctx.audio.into_iter().chain(ctx.video) {
            transport
                .attach_track(track)
                .await
                .map_err(|e| SessionError::negotiation(&ctx.remote_id, format!("{:#}", e)))?;
        }

        let initiator = ctx.local_id.initiates_with(&ctx.remote_id);
        debug!(
            "Supervising {} (generation {}, initiator: {})",
            ctx.remote_id, ctx.generation, initiator
        );

        Ok(Self {
            remote_id: ctx.remote_id,
            generation: ctx.generation,
            transport,
            transport_events,
            commands,
            signal: ctx.signal,
            events: ctx.events,
            cancel,
            negotiation: Negotiation::new(initiator),
            reported_negotiation: NegotiationState::Idle,
            health: PeerHealth::new(ctx.policy.clone(), Instant::now()),
            policy: ctx.policy,
            awaiting_answer: None,
            signaling_up: true,
            local_seq: 0,
            remote_seq: 0,
            has_remote_description: false,
            early_candidates: Vec::new(),
            remote_tracks: BTreeSet::new(),
            video_kind,
        })
    }

    async fn supervise(mut self) {
        if let Err(e) = self.drive().await {
            warn!("Dropping connection to {}: {}", self.remote_id, e);
            self.emit(PeerEventKind::Failed(e));
        }

        self.negotiation.close();
        self.health.handle(HealthSignal::Closed, Instant::now());
        if let Err(e) = self.transport.close().await {
            debug!("Closing transport to {} failed: {:#}", self.remote_id, e);
        }
        debug!("Supervisor for {} finished", self.remote_id);
    }

    async fn drive(&mut self) -> Result<(), SessionError> {
        if self.negotiation.is_initiator() {
            self.start_offer(false).await?;
        }

        loop {
            let deadline = self.health.deadline();
            let answer_deadline = self.awaiting_answer.and_then(|a| a.deadline);

            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => return Ok(()),

                cmd = self.commands.recv() => match cmd {
                    Some(PeerCommand::Signal(payload)) => self.on_signal(payload).await?,
                    Some(PeerCommand::ReplaceVideo(track)) => self.replace_video(track).await?,
                    Some(PeerCommand::SignalingUp(up)) => self.on_signaling_up(up),
                    None => return Ok(()),
                },

                Some(event) = self.transport_events.recv() => {
                    self.on_transport_event(event).await?;
                }

                _ = wait_until(deadline) => self.apply_health(HealthSignal::Tick).await?,

                _ = wait_until(answer_deadline) => self.on_answer_timeout().await?,
            }
        }
    }

    async fn on_signal(&mut self, payload: SignalPayload) -> Result<(), SessionError> {
        match payload {
            SignalPayload::Offer { sdp, ice_restart } => self.on_offer(sdp, ice_restart).await,
            SignalPayload::Answer { sdp } => self.on_answer(sdp).await,
            SignalPayload::IceCandidate {
                candidate,
                sdp_mid,
                sdp_m_line_index,
                seq,
            } => {
                self.on_remote_candidate(
                    IceCandidate {
                        candidate,
                        sdp_mid,
                        sdp_m_line_index,
                    },
                    seq,
                )
                .await;
                Ok(())
            }
            SignalPayload::TrackReplaced { removed, added } => {
                self.remote_track_removed(removed);
                self.remote_track_added(added);
                Ok(())
            }
            SignalPayload::MediaState {
                audio_enabled,
                video_enabled,
            } => {
                self.emit(PeerEventKind::RemoteMediaState {
                    audio_enabled,
                    video_enabled,
                });
                Ok(())
            }
            other => {
                debug!("Supervisor ignoring {} from {}", other.name(), self.remote_id);
                Ok(())
            }
        }
    }

    async fn on_offer(&mut self, sdp: String, ice_restart: bool) -> Result<(), SessionError> {
        let rollback = match self.negotiation.on_remote_offer() {
            OfferDecision::Reject => {
                debug!("Glare with {}: keeping our offer", self.remote_id);
                return Ok(());
            }
            OfferDecision::Accept { rollback } => rollback,
        };

        if rollback {
            debug!("Glare with {}: rolling back our offer", self.remote_id);
            self.awaiting_answer = None;
            self.transport.rollback().await.map_err(|e| self.failed(e))?;
        }
        self.sync_negotiation();
        if ice_restart {
            info!("ICE restart requested by {}", self.remote_id);
        }

        let answer = self
            .transport
            .accept_offer(sdp)
            .await
            .map_err(|e| self.failed(e))?;
        self.remote_description_applied().await;

        self.negotiation.on_answer_created();
        self.sync_negotiation();
        self.signal
            .send(SignalPayload::Answer { sdp: answer }, Some(&self.remote_id));
        self.negotiation.on_answer_sent();
        self.sync_negotiation();

        self.settled().await
    }

    async fn on_answer(&mut self, sdp: String) -> Result<(), SessionError> {
        if !self.negotiation.on_remote_answer() {
            debug!("Ignoring unexpected answer from {}", self.remote_id);
            return Ok(());
        }
        self.awaiting_answer = None;

        self.transport
            .accept_answer(sdp)
            .await
            .map_err(|e| self.failed(e))?;
        self.sync_negotiation();
        self.remote_description_applied().await;

        self.settled().await
    }

    /// Runs after every completed exchange.
    async fn settled(&mut self) -> Result<(), SessionError> {
        self.apply_health(HealthSignal::NegotiationStable).await?;
        if let Some(ice_restart) = self.negotiation.take_pending() {
            self.start_offer(ice_restart).await?;
        }
        Ok(())
    }

    async fn start_offer(&mut self, ice_restart: bool) -> Result<(), SessionError> {
        if !self.negotiation.request_offer(ice_restart) {
            debug!("Renegotiation with {} queued", self.remote_id);
            return Ok(());
        }
        self.send_offer(ice_restart, 1).await
    }

    async fn send_offer(&mut self, ice_restart: bool, attempt: u32) -> Result<(), SessionError> {
        self.sync_negotiation();

        let sdp = self
            .transport
            .create_offer(ice_restart)
            .await
            .map_err(|e| self.failed(e))?;
        self.signal.send(
            SignalPayload::Offer { sdp, ice_restart },
            Some(&self.remote_id),
        );
        self.awaiting_answer = Some(AwaitedAnswer {
            ice_restart,
            attempts: attempt,
            deadline: self.answer_deadline(),
        });
        Ok(())
    }

    /// The offer or its answer was lost on the way. Sends it again a bounded
    /// number of times, then gives the peer up.
    async fn on_answer_timeout(&mut self) -> Result<(), SessionError> {
        let Some(awaited) = self.awaiting_answer.take() else {
            return Ok(());
        };
        if self.negotiation.state() != NegotiationState::OfferSent {
            return Ok(());
        }
        if awaited.attempts >= self.policy.max_offer_attempts {
            return Err(SessionError::negotiation(
                &self.remote_id,
                format!("no answer after {} offers", awaited.attempts),
            ));
        }

        warn!(
            "No answer from {} to offer {}, sending it again",
            self.remote_id, awaited.attempts
        );
        self.transport.rollback().await.map_err(|e| self.failed(e))?;
        self.send_offer(awaited.ice_restart, awaited.attempts + 1)
            .await
    }

    fn on_signaling_up(&mut self, up: bool) {
        self.signaling_up = up;
        let deadline = self.answer_deadline();
        if let Some(awaited) = self.awaiting_answer.as_mut() {
            awaited.deadline = deadline;
        }
    }

    fn answer_deadline(&self) -> Option<Instant> {
        self.signaling_up
            .then(|| Instant::now() + self.policy.answer_timeout)
    }

    async fn restart_ice(&mut self) -> Result<(), SessionError> {
        if self.negotiation.abandon_offer() {
            debug!("Abandoning unanswered offer to {}", self.remote_id);
            self.awaiting_answer = None;
            self.transport.rollback().await.map_err(|e| self.failed(e))?;
            self.sync_negotiation();
        }
        self.start_offer(true).await
    }

    async fn replace_video(&mut self, track: Option<Arc<LocalTrack>>) -> Result<(), SessionError> {
        let next_kind = track.as_ref().map(|t| t.kind());
        self.transport
            .replace_video_track(track)
            .await
            .map_err(|e| self.failed(e))?;

        if let (Some(removed), Some(added)) = (self.video_kind, next_kind) {
            if removed != added {
                self.signal.send(
                    SignalPayload::TrackReplaced { removed, added },
                    Some(&self.remote_id),
                );
            }
        }
        self.video_kind = next_kind;

        self.start_offer(false).await
    }

    async fn on_remote_candidate(&mut self, candidate: IceCandidate, seq: u64) {
        if seq <= self.remote_seq {
            debug!(
                "Ignoring stale candidate {} from {} (last {})",
                seq, self.remote_id, self.remote_seq
            );
            return;
        }
        self.remote_seq = seq;

        if !self.has_remote_description {
            self.early_candidates.push(candidate);
            return;
        }
        if let Err(e) = self.transport.add_ice_candidate(candidate).await {
            warn!("Rejected candidate from {}: {:#}", self.remote_id, e);
        }
    }

    async fn remote_description_applied(&mut self) {
        self.has_remote_description = true;
        for candidate in std::mem::take(&mut self.early_candidates) {
            if let Err(e) = self.transport.add_ice_candidate(candidate).await {
                warn!("Rejected early candidate from {}: {:#}", self.remote_id, e);
            }
        }
    }

    async fn on_transport_event(&mut self, event: TransportEvent) -> Result<(), SessionError> {
        match event {
            TransportEvent::CandidateGenerated(candidate) => {
                self.local_seq += 1;
                self.signal.send(
                    SignalPayload::IceCandidate {
                        candidate: candidate.candidate,
                        sdp_mid: candidate.sdp_mid,
                        sdp_m_line_index: candidate.sdp_m_line_index,
                        seq: self.local_seq,
                    },
                    Some(&self.remote_id),
                );
                Ok(())
            }
            TransportEvent::LinkStateChanged(state) => match state {
                LinkState::Connected => self.apply_health(HealthSignal::LinkConnected).await,
                LinkState::Disconnected => self.apply_health(HealthSignal::LinkDisconnected).await,
                LinkState::Failed => self.apply_health(HealthSignal::LinkFailed).await,
                LinkState::Connecting | LinkState::Closed => Ok(()),
            },
            TransportEvent::RemoteTrackAdded(kind) => {
                self.remote_track_added(kind);
                Ok(())
            }
            TransportEvent::RemoteTrackRemoved(kind) => {
                self.remote_track_removed(kind);
                Ok(())
            }
            TransportEvent::Quality { packet_loss, rtt } => {
                self.apply_health(HealthSignal::Quality { packet_loss, rtt })
                    .await
            }
        }
    }

    async fn apply_health(&mut self, signal: HealthSignal) -> Result<(), SessionError> {
        let before = self.health.state();
        let action = self.health.handle(signal, Instant::now());
        if self.health.state() != before {
            self.emit(PeerEventKind::HealthChanged(self.health.state()));
        }

        match action {
            Some(HealthAction::StartIceRestart { attempt }) => {
                info!("Connection to {} lost, restart attempt {}", self.remote_id, attempt);
                // The tie-break initiator restarts; the other side waits for its offer.
                if self.negotiation.is_initiator() {
                    self.restart_ice().await?;
                }
                Ok(())
            }
            Some(HealthAction::GiveUp) => Err(SessionError::PeerTimeout {
                peer: self.remote_id.clone(),
            }),
            None => Ok(()),
        }
    }

    fn remote_track_added(&mut self, kind: TrackKind) {
        if self.remote_tracks.insert(kind) {
            self.emit(PeerEventKind::TrackAdded(kind));
        }
    }

    fn remote_track_removed(&mut self, kind: TrackKind) {
        if self.remote_tracks.remove(&kind) {
            self.emit(PeerEventKind::TrackRemoved(kind));
        }
    }

    fn sync_negotiation(&mut self) {
        let state = self.negotiation.state();
        if state != self.reported_negotiation {
            self.reported_negotiation = state;
            self.emit(PeerEventKind::NegotiationChanged(state));
        }
    }

    fn failed(&self, err: anyhow::Error) -> SessionError {
        SessionError::negotiation(&self.remote_id, format!("{:#}", err))
    }

    fn emit(&self, kind: PeerEventKind) {
        let _ = self.events.send(PeerEvent {
            peer_id: self.remote_id.clone(),
            generation: self.generation,
            kind,
        });
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
