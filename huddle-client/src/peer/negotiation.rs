use huddle_core::NegotiationState;

/// How to treat an offer received from the remote peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferDecision {
    /// Apply the offer; `rollback` discards our own outstanding offer first.
    Accept { rollback: bool },
    /// Our outstanding offer wins the glare race.
    Reject,
}

/// Offer/answer bookkeeping for one remote peer.
///
/// At most one exchange is outstanding. Renegotiations requested meanwhile
/// are remembered and started once the exchange settles. On glare the
/// initiator's offer wins.
#[derive(Debug)]
pub struct Negotiation {
    state: NegotiationState,
    initiator: bool,
    pending: bool,
    pending_restart: bool,
}

impl Negotiation {
    pub fn new(initiator: bool) -> Self {
        Self {
            state: NegotiationState::Idle,
            initiator,
            pending: false,
            pending_restart: false,
        }
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn is_initiator(&self) -> bool {
        self.initiator
    }

    /// Starts an offer if possible, otherwise queues it. Returns true when
    /// the caller must create and send an offer now.
    pub fn request_offer(&mut self, ice_restart: bool) -> bool {
        if self.state.is_settled() {
            self.state = NegotiationState::OfferSent;
            return true;
        }
        if self.state != NegotiationState::Closed {
            self.pending = true;
            self.pending_restart |= ice_restart;
        }
        false
    }

    pub fn on_remote_offer(&mut self) -> OfferDecision {
        match self.state {
            NegotiationState::Closed => OfferDecision::Reject,
            NegotiationState::OfferSent if self.initiator => OfferDecision::Reject,
            NegotiationState::OfferSent => {
                // Our offer is dropped; it goes out again once this one settles.
                self.pending = true;
                self.state = NegotiationState::OfferReceived;
                OfferDecision::Accept { rollback: true }
            }
            _ => {
                self.state = NegotiationState::OfferReceived;
                OfferDecision::Accept { rollback: false }
            }
        }
    }

    pub fn on_answer_created(&mut self) {
        if self.state == NegotiationState::OfferReceived {
            self.state = NegotiationState::AnswerSent;
        }
    }

    /// Our answer is on its way; the exchange is complete from our side.
    pub fn on_answer_sent(&mut self) {
        if self.state == NegotiationState::AnswerSent {
            self.state = NegotiationState::Stable;
        }
    }

    /// Returns false for an answer nobody asked for.
    pub fn on_remote_answer(&mut self) -> bool {
        if self.state != NegotiationState::OfferSent {
            return false;
        }
        self.state = NegotiationState::Stable;
        true
    }

    /// Gives up on an offer whose answer never came. Returns true if there
    /// was one to abandon.
    pub fn abandon_offer(&mut self) -> bool {
        if self.state != NegotiationState::OfferSent {
            return false;
        }
        self.state = NegotiationState::Stable;
        true
    }

    /// The queued renegotiation to start now, if the exchange has settled.
    /// The flag tells whether it must carry an ICE restart.
    pub fn take_pending(&mut self) -> Option<bool> {
        if !self.pending || !self.state.is_settled() {
            return None;
        }
        self.pending = false;
        Some(std::mem::take(&mut self.pending_restart))
    }

    pub fn close(&mut self) {
        self.state = NegotiationState::Closed;
        self.pending = false;
        self.pending_restart = false;
    }
}
