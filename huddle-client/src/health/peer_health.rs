use crate::config::HealthPolicy;
use huddle_core::HealthState;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Inputs to the per-peer health machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HealthSignal {
    NegotiationStable,
    LinkConnected,
    LinkDisconnected,
    LinkFailed,
    Quality { packet_loss: f64, rtt: Duration },
    /// The deadline returned by `PeerHealth::deadline` has passed.
    Tick,
    Closed,
}

/// What the supervisor must do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthAction {
    StartIceRestart { attempt: u32 },
    GiveUp,
}

/// Health of the media path to one remote peer.
///
/// `connecting` waits for a stable negotiation and an established link.
/// Losing the link moves to `reconnecting`, which asks for an ICE restart
/// right away and again every `restart_interval` until the attempts or the
/// maximum wait run out.
#[derive(Debug)]
pub struct PeerHealth {
    state: HealthState,
    policy: HealthPolicy,
    negotiated: bool,
    link_up: bool,
    attempts: u32,
    reconnect_started: Option<Instant>,
    deadline: Option<Instant>,
}

impl PeerHealth {
    pub fn new(policy: HealthPolicy, now: Instant) -> Self {
        let deadline = Some(now + policy.connect_timeout);
        Self {
            state: HealthState::Connecting,
            policy,
            negotiated: false,
            link_up: false,
            attempts: 0,
            reconnect_started: None,
            deadline,
        }
    }

    pub fn state(&self) -> HealthState {
        self.state
    }

    /// When the owner must feed `HealthSignal::Tick`.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn handle(&mut self, signal: HealthSignal, now: Instant) -> Option<HealthAction> {
        if self.state.is_terminal() {
            return None;
        }

        match signal {
            HealthSignal::Closed => {
                self.enter(HealthState::Closed);
                None
            }
            HealthSignal::NegotiationStable => {
                self.negotiated = true;
                self.try_connect();
                None
            }
            HealthSignal::LinkConnected => {
                self.link_up = true;
                match self.state {
                    HealthState::Reconnecting => self.enter(HealthState::Connected),
                    _ => self.try_connect(),
                }
                None
            }
            HealthSignal::LinkDisconnected | HealthSignal::LinkFailed => {
                self.link_up = false;
                match self.state {
                    HealthState::Connected | HealthState::Degraded => {
                        self.attempts = 1;
                        self.reconnect_started = Some(now);
                        self.deadline = Some(now + self.policy.restart_interval());
                        self.enter(HealthState::Reconnecting);
                        Some(HealthAction::StartIceRestart { attempt: 1 })
                    }
                    _ => None,
                }
            }
            HealthSignal::Quality { packet_loss, rtt } => {
                let degraded = self.policy.is_degraded(packet_loss, rtt);
                match (self.state, degraded) {
                    (HealthState::Connected, true) => self.enter(HealthState::Degraded),
                    (HealthState::Degraded, false) => self.enter(HealthState::Connected),
                    _ => {}
                }
                None
            }
            HealthSignal::Tick => self.tick(now),
        }
    }

    fn tick(&mut self, now: Instant) -> Option<HealthAction> {
        if self.deadline.is_none_or(|deadline| now < deadline) {
            return None;
        }

        match self.state {
            HealthState::Connecting => {
                self.enter(HealthState::Failed);
                Some(HealthAction::GiveUp)
            }
            HealthState::Reconnecting => {
                let give_up_at = self
                    .reconnect_started
                    .map(|started| started + self.policy.max_reconnect_wait)
                    .unwrap_or(now);

                if self.attempts >= self.policy.max_restart_attempts || now >= give_up_at {
                    self.enter(HealthState::Failed);
                    return Some(HealthAction::GiveUp);
                }

                self.attempts += 1;
                self.deadline = Some((now + self.policy.restart_interval()).min(give_up_at));
                Some(HealthAction::StartIceRestart {
                    attempt: self.attempts,
                })
            }
            _ => {
                self.deadline = None;
                None
            }
        }
    }

    fn try_connect(&mut self) {
        if self.state == HealthState::Connecting && self.negotiated && self.link_up {
            self.enter(HealthState::Connected);
        }
    }

    fn enter(&mut self, state: HealthState) {
        debug!("Health {:?} -> {:?}", self.state, state);
        self.state = state;
        if matches!(
            state,
            HealthState::Connected | HealthState::Degraded | HealthState::Failed | HealthState::Closed
        ) {
            self.deadline = None;
            self.reconnect_started = None;
        }
    }
}
