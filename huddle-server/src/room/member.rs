use huddle_core::{PeerId, SignalMessage};
use std::collections::VecDeque;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub(crate) struct Member {
    pub peer_id: PeerId,
    pub epoch: u64,
    /// Running grace timer while the member's connection is gone.
    grace: Option<JoinHandle<()>>,
    backlog: VecDeque<SignalMessage>,
}

impl Member {
    pub fn new(peer_id: PeerId, epoch: u64) -> Self {
        Self {
            peer_id,
            epoch,
            grace: None,
            backlog: VecDeque::new(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.grace.is_none()
    }

    pub fn suspend(&mut self, grace: JoinHandle<()>) {
        if let Some(old) = self.grace.replace(grace) {
            old.abort();
        }
    }

    /// Back to connected under a new epoch; returns messages held meanwhile.
    pub fn resume(&mut self, epoch: u64) -> Vec<SignalMessage> {
        self.epoch = epoch;
        if let Some(grace) = self.grace.take() {
            grace.abort();
        }
        self.backlog.drain(..).collect()
    }

    /// Puts messages a dead connection never wrote ahead of the backlog.
    pub fn requeue(&mut self, undelivered: Vec<SignalMessage>, limit: usize) {
        if undelivered.is_empty() {
            return;
        }
        debug!(
            "Requeueing {} undelivered messages for {}",
            undelivered.len(),
            self.peer_id
        );
        for msg in undelivered.into_iter().rev() {
            self.backlog.push_front(msg);
        }
        while self.backlog.len() > limit {
            self.backlog.pop_front();
        }
    }

    pub fn buffer(&mut self, msg: SignalMessage, limit: usize) {
        if self.backlog.len() >= limit {
            warn!(
                "Backlog full for {}, dropping oldest {} message",
                self.peer_id,
                self.backlog
                    .front()
                    .map(|m| m.payload.name())
                    .unwrap_or("?")
            );
            self.backlog.pop_front();
        }
        self.backlog.push_back(msg);
    }
}

impl Drop for Member {
    fn drop(&mut self) {
        if let Some(grace) = self.grace.take() {
            grace.abort();
        }
    }
}
