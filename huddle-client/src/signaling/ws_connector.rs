use crate::signaling::{SignalingConnector, SignalingLink, drain_unsent};
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use huddle_core::{PeerId, RoomId, SignalMessage};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

const LINK_BUFFER: usize = 64;

/// Connects to the relay's `/ws/{room_id}/{peer_id}` endpoint.
#[derive(Debug, Clone)]
pub struct WsConnector {
    base_url: String,
}

impl WsConnector {
    /// `base_url` is e.g. `ws://127.0.0.1:3000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self, room_id: &RoomId, peer_id: &PeerId) -> String {
        format!("{}/ws/{}/{}", self.base_url, room_id, peer_id)
    }
}

#[async_trait]
impl SignalingConnector for WsConnector {
    async fn connect(&self, room_id: &RoomId, peer_id: &PeerId) -> Result<SignalingLink> {
        let url = self.endpoint(room_id, peer_id);
        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .with_context(|| format!("Failed to connect to {}", url))?;
        debug!("Connected to relay at {}", url);

        let (mut sender, mut receiver) = ws_stream.split();
        let (out_tx, mut out_rx) = mpsc::channel::<SignalMessage>(LINK_BUFFER);
        let (in_tx, in_rx) = mpsc::channel::<SignalMessage>(LINK_BUFFER);
        let (undelivered_tx, undelivered) = oneshot::channel();
        // Set by the reader once the socket is gone.
        let dead = CancellationToken::new();

        let writer_dead = dead.clone();
        tokio::spawn(async move {
            let mut failed = None;
            loop {
                let msg = tokio::select! {
                    biased;
                    _ = writer_dead.cancelled() => break,
                    msg = out_rx.recv() => match msg {
                        Some(msg) => msg,
                        None => break,
                    },
                };
                let text = match serde_json::to_string(&msg) {
                    Ok(text) => text,
                    Err(e) => {
                        error!("Failed to serialize {}: {}", msg.payload.name(), e);
                        continue;
                    }
                };
                if sender.send(Message::Text(text.into())).await.is_err() {
                    failed = Some(msg);
                    break;
                }
            }

            let unsent = drain_unsent(failed, &mut out_rx);
            if !unsent.is_empty() {
                debug!("Handing back {} undelivered messages", unsent.len());
            }
            let _ = undelivered_tx.send(unsent);
            let _ = sender.close().await;
        });

        tokio::spawn(async move {
            while let Some(frame) = receiver.next().await {
                let text = match frame {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => continue,
                };
                match serde_json::from_str::<SignalMessage>(text.as_str()) {
                    Ok(msg) => {
                        if in_tx.send(msg).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Ignoring malformed relay message: {}", e),
                }
            }
            dead.cancel();
        });

        Ok(SignalingLink {
            outgoing: out_tx,
            incoming: in_rx,
            undelivered,
        })
    }
}
