use async_trait::async_trait;
use huddle_core::{PeerId, RoomId, SignalMessage};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Upper bound on waiting for a dead connection's writer to hand back.
const UNDELIVERED_WAIT: Duration = Duration::from_secs(2);

/// One established connection to the relay. The connection is gone once
/// `incoming` yields `None` or `outgoing` refuses a message.
pub struct SignalingLink {
    pub outgoing: mpsc::Sender<SignalMessage>,
    pub incoming: mpsc::Receiver<SignalMessage>,
    /// Filled by the writer when it stops: messages it accepted but never
    /// put on the wire, in send order.
    pub undelivered: oneshot::Receiver<Vec<SignalMessage>>,
}

impl SignalingLink {
    /// Closes the link and takes back what it never delivered.
    pub async fn into_undelivered(self) -> Vec<SignalMessage> {
        let SignalingLink {
            outgoing,
            incoming,
            undelivered,
        } = self;
        drop(outgoing);
        drop(incoming);

        match tokio::time::timeout(UNDELIVERED_WAIT, undelivered).await {
            Ok(Ok(messages)) => messages,
            _ => Vec::new(),
        }
    }
}

/// Everything still queued on `rx`, after `first`.
pub fn drain_unsent(
    first: Option<SignalMessage>,
    rx: &mut mpsc::Receiver<SignalMessage>,
) -> Vec<SignalMessage> {
    rx.close();
    let mut unsent: Vec<SignalMessage> = first.into_iter().collect();
    while let Ok(msg) = rx.try_recv() {
        unsent.push(msg);
    }
    unsent
}

/// Opens connections to the relay for a (room, peer) pair.
#[async_trait]
pub trait SignalingConnector: Send + Sync {
    async fn connect(&self, room_id: &RoomId, peer_id: &PeerId) -> anyhow::Result<SignalingLink>;
}
