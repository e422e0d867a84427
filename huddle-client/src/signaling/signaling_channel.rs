use crate::config::BackoffConfig;
use crate::error::SessionError;
use crate::signaling::{SignalingConnector, SignalingLink, full_jitter};
use huddle_core::{PeerId, RoomId, SignalMessage, SignalPayload};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What the channel reports to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Message(SignalMessage),
    /// The relay connection dropped; reconnecting in the background.
    Interrupted,
    /// A new relay connection is up and `join` was re-sent.
    Restored,
    Closed,
}

/// Cloneable handle for queueing messages on a channel.
#[derive(Clone)]
pub struct SignalSender {
    room_id: RoomId,
    local_id: PeerId,
    queue: mpsc::UnboundedSender<SignalMessage>,
}

impl SignalSender {
    /// Queues a message; returns false once the channel is closed. Messages
    /// leave in queue order, which keeps every (sender, target) pair ordered.
    pub fn send(&self, payload: SignalPayload, target: Option<&PeerId>) -> bool {
        let mut msg = SignalMessage::new(self.room_id.clone(), self.local_id.clone(), payload);
        msg.target_id = target.cloned();
        self.queue.send(msg).is_ok()
    }
}

/// Persistent connection of one participant to the relay for one room.
pub struct SignalingChannel {
    sender: SignalSender,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SignalingChannel {
    /// Connects once, failing with `SignalingUnavailable` if the relay cannot
    /// be reached. Later connection losses are retried in the background.
    pub async fn open(
        connector: Arc<dyn SignalingConnector>,
        room_id: RoomId,
        local_id: PeerId,
        backoff: BackoffConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ChannelEvent>), SessionError> {
        let link = connector
            .connect(&room_id, &local_id)
            .await
            .map_err(|e| SessionError::SignalingUnavailable(format!("{:#}", e)))?;
        info!("Signaling channel open for {} in room {}", local_id, room_id);

        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let task = ChannelTask {
            connector,
            room_id: room_id.clone(),
            local_id: local_id.clone(),
            backoff,
            queue: queue_rx,
            retry: VecDeque::new(),
            events: event_tx,
            cancel: cancel.clone(),
        };

        let channel = Self {
            sender: SignalSender {
                room_id,
                local_id,
                queue: queue_tx,
            },
            cancel,
            task: tokio::spawn(task.run(link)),
        };
        Ok((channel, event_rx))
    }

    pub fn sender(&self) -> SignalSender {
        self.sender.clone()
    }

    pub fn send(&self, payload: SignalPayload, target: Option<&PeerId>) -> bool {
        self.sender.send(payload, target)
    }

    /// Sends `leave` if connected and stops the channel.
    pub async fn close(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!("Signaling task ended abnormally: {}", e);
        }
    }
}

enum PumpExit {
    Cancelled,
    LinkLost,
}

struct ChannelTask {
    connector: Arc<dyn SignalingConnector>,
    room_id: RoomId,
    local_id: PeerId,
    backoff: BackoffConfig,
    queue: mpsc::UnboundedReceiver<SignalMessage>,
    /// Dequeued messages the previous link refused or never delivered; sent
    /// first on the next.
    retry: VecDeque<SignalMessage>,
    events: mpsc::UnboundedSender<ChannelEvent>,
    cancel: CancellationToken,
}

impl ChannelTask {
    async fn run(mut self, mut link: SignalingLink) {
        loop {
            match self.pump(&mut link).await {
                PumpExit::Cancelled => {
                    let leave = self.envelope(SignalPayload::Leave);
                    let _ = link.outgoing.send(leave).await;
                    break;
                }
                PumpExit::LinkLost => {
                    warn!(
                        "Signaling connection lost for {} in room {}",
                        self.local_id, self.room_id
                    );
                    let _ = self.events.send(ChannelEvent::Interrupted);
                    self.take_back(link.into_undelivered().await);

                    match self.reconnect().await {
                        Some(next) => {
                            link = next;
                            info!("Signaling connection restored for {}", self.local_id);
                            let _ = self.events.send(ChannelEvent::Restored);
                        }
                        None => break,
                    }
                }
            }
        }

        debug!("Signaling task for {} finished", self.local_id);
        let _ = self.events.send(ChannelEvent::Closed);
    }

    /// Announces presence on `link`, then moves messages both ways until the
    /// link drops or the channel is closed.
    ///
    /// Messages held from an earlier link go out only once the relay's
    /// welcome confirms the membership was resumed; until then new messages
    /// queue behind them. A fresh membership discards them, since every peer
    /// session is rebuilt.
    async fn pump(&mut self, link: &mut SignalingLink) -> PumpExit {
        if link
            .outgoing
            .send(self.envelope(SignalPayload::Join))
            .await
            .is_err()
        {
            return PumpExit::LinkLost;
        }

        let mut holding = !self.retry.is_empty();

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => return PumpExit::Cancelled,

                incoming = link.incoming.recv() => match incoming {
                    Some(msg) => {
                        let resumed = match &msg.payload {
                            SignalPayload::Welcome { resumed, .. } if holding => Some(*resumed),
                            _ => None,
                        };
                        let _ = self.events.send(ChannelEvent::Message(msg));

                        if let Some(resumed) = resumed {
                            holding = false;
                            if !resumed {
                                debug!(
                                    "Membership of {} not resumed, dropping {} held messages",
                                    self.local_id,
                                    self.retry.len()
                                );
                                self.retry.clear();
                            }
                            while let Some(msg) = self.retry.pop_front() {
                                if let Err(mpsc::error::SendError(msg)) = link.outgoing.send(msg).await {
                                    self.retry.push_front(msg);
                                    return PumpExit::LinkLost;
                                }
                            }
                        }
                    }
                    None => return PumpExit::LinkLost,
                },

                queued = self.queue.recv() => match queued {
                    Some(msg) if holding => self.retry.push_back(msg),
                    Some(msg) => {
                        if let Err(mpsc::error::SendError(msg)) = link.outgoing.send(msg).await {
                            self.retry.push_back(msg);
                            return PumpExit::LinkLost;
                        }
                    }
                    // Every sender is gone, so nobody can observe the session.
                    None => return PumpExit::Cancelled,
                },
            }
        }
    }

    /// Puts messages a dead link never delivered ahead of the ones it
    /// refused. Presence is re-announced by `pump` anyway.
    fn take_back(&mut self, undelivered: Vec<SignalMessage>) {
        let mut count = 0;
        for msg in undelivered.into_iter().rev() {
            if matches!(msg.payload, SignalPayload::Join | SignalPayload::Leave) {
                continue;
            }
            self.retry.push_front(msg);
            count += 1;
        }
        if count > 0 {
            debug!("{} messages held for the next connection", count);
        }
    }

    async fn reconnect(&mut self) -> Option<SignalingLink> {
        let mut attempt: u32 = 0;
        loop {
            let delay = full_jitter(&self.backoff, attempt);
            debug!("Reconnect attempt {} in {:?}", attempt + 1, delay);

            tokio::select! {
                _ = self.cancel.cancelled() => return None,
                _ = tokio::time::sleep(delay) => {}
            }

            match self.connector.connect(&self.room_id, &self.local_id).await {
                Ok(link) => return Some(link),
                Err(e) => {
                    warn!("Reconnect attempt {} failed: {:#}", attempt + 1, e);
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }

    fn envelope(&self, payload: SignalPayload) -> SignalMessage {
        SignalMessage::new(self.room_id.clone(), self.local_id.clone(), payload)
    }
}
