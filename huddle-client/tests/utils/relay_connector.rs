use anyhow::bail;
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use huddle_client::signaling::{SignalingConnector, SignalingLink, drain_unsent};
use huddle_core::{PeerId, RoomId, SignalMessage};
use huddle_server::SignalingService;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

const LINK_BUFFER: usize = 64;

/// SignalingConnector wired straight into an in-process SignalingService,
/// with switches to cut a participant off.
#[derive(Clone)]
pub struct RelayConnector {
    service: SignalingService,
    unreachable: Arc<DashSet<PeerId>>,
    links: Arc<DashMap<PeerId, CancellationToken>>,
}

impl RelayConnector {
    pub fn new(service: SignalingService) -> Self {
        Self {
            service,
            unreachable: Arc::new(DashSet::new()),
            links: Arc::new(DashMap::new()),
        }
    }

    /// While unreachable, connection attempts of `peer` fail.
    pub fn set_reachable(&self, peer: &PeerId, reachable: bool) {
        if reachable {
            self.unreachable.remove(peer);
        } else {
            self.unreachable.insert(peer.clone());
        }
    }

    /// Drops the current connection of `peer` as if the network failed.
    pub fn drop_link(&self, peer: &PeerId) {
        if let Some((_, kill)) = self.links.remove(peer) {
            kill.cancel();
        }
    }
}

#[async_trait]
impl SignalingConnector for RelayConnector {
    async fn connect(&self, room_id: &RoomId, peer_id: &PeerId) -> anyhow::Result<SignalingLink> {
        if self.unreachable.contains(peer_id) {
            bail!("relay unreachable for {}", peer_id);
        }

        let mut attachment = self.service.connect(room_id, peer_id);
        let (out_tx, mut out_rx) = mpsc::channel(LINK_BUFFER);
        let (in_tx, in_rx) = mpsc::channel(LINK_BUFFER);
        let (undelivered_tx, undelivered) = oneshot::channel();

        let kill = CancellationToken::new();
        self.links.insert(peer_id.clone(), kill.clone());

        let service = self.service.clone();
        let room_id = room_id.clone();
        let peer_id = peer_id.clone();
        tokio::spawn(async move {
            let mut refused = None;
            loop {
                tokio::select! {
                    _ = kill.cancelled() => break,
                    msg = out_rx.recv() => match msg {
                        Some(msg) => service.ingest(&room_id, &peer_id, attachment.epoch, msg).await,
                        None => break,
                    },
                    msg = attachment.rx.recv() => match msg {
                        Some(msg) => {
                            if let Err(mpsc::error::SendError(msg)) = in_tx.send(msg).await {
                                refused = Some(msg);
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }

            // Both directions hand back what never crossed the link.
            let _ = undelivered_tx.send(drain_unsent(None, &mut out_rx));
            attachment.rx.close();
            let mut held: Vec<SignalMessage> = refused.into_iter().collect();
            while let Ok(msg) = attachment.rx.try_recv() {
                held.push(msg);
            }
            service
                .disconnect(&room_id, &peer_id, attachment.epoch, held)
                .await;
        });

        Ok(SignalingLink {
            outgoing: out_tx,
            incoming: in_rx,
            undelivered,
        })
    }
}
