use crate::signaling::SignalingService;
use axum::Router;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use futures::{SinkExt, StreamExt};
use huddle_core::{PeerId, RoomId, SignalMessage};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

/// Relay routes: `/ws/{room_id}/{peer_id}` and `/health`.
pub fn router(service: SignalingService) -> Router {
    Router::new()
        .route("/ws/{room_id}/{peer_id}", get(ws_handler))
        .route("/health", get(|| async { "ok" }))
        .with_state(service)
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path((room_id, peer_id)): Path<(String, String)>,
    State(service): State<SignalingService>,
) -> impl IntoResponse {
    let room_id = RoomId::from(room_id);
    let peer_id = PeerId::from(peer_id);

    ws.on_upgrade(move |socket| handle_socket(socket, room_id, peer_id, service))
}

async fn handle_socket(socket: WebSocket, room_id: RoomId, peer_id: PeerId, service: SignalingService) {
    info!("New WebSocket connection: {} in room {}", peer_id, room_id);

    let attachment = service.connect(&room_id, &peer_id);
    let epoch = attachment.epoch;
    let mut rx = attachment.rx;

    let (mut sender, mut receiver) = socket.split();

    // Fired when the reading half ends, so the writer stops and hands back
    // what it still holds.
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

    let mut send_task = tokio::spawn(async move {
        let mut failed = None;
        loop {
            let msg = tokio::select! {
                biased;
                _ = &mut stop_rx => break,
                msg = rx.recv() => match msg {
                    Some(msg) => msg,
                    None => break,
                },
            };
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize signal message: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                failed = Some(msg);
                break;
            }
        }
        let _ = sender.close().await;

        rx.close();
        let mut unsent: Vec<SignalMessage> = failed.into_iter().collect();
        while let Ok(msg) = rx.try_recv() {
            unsent.push(msg);
        }
        unsent
    });

    let mut recv_task = tokio::spawn({
        let service = service.clone();
        let room_id = room_id.clone();
        let peer_id = peer_id.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<SignalMessage>(&text) {
                        Ok(signal) => service.ingest(&room_id, &peer_id, epoch, signal).await,
                        Err(e) => warn!("Invalid SignalMessage from {}: {:?}", peer_id, e),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    let undelivered = tokio::select! {
        unsent = (&mut send_task) => {
            recv_task.abort();
            unsent.unwrap_or_default()
        }
        _ = (&mut recv_task) => {
            let _ = stop_tx.send(());
            send_task.await.unwrap_or_default()
        }
    };
    if !undelivered.is_empty() {
        debug!("{} messages for {} were not written", undelivered.len(), peer_id);
    }

    service.disconnect(&room_id, &peer_id, epoch, undelivered).await;
    info!("WebSocket disconnected: {} from room {}", peer_id, room_id);
}
