//! Change notifications over WebSocket.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};

use super::tables::{parse_table, ApiError};
use super::AppState;
use crate::models::Bucket;
use crate::remote::ChangeEvent;

/// Tracks realtime subscribers per table.
pub struct ChangeHub {
    channels: RwLock<HashMap<Bucket, broadcast::Sender<ChangeEvent>>>,
}

impl ChangeHub {
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    pub async fn subscribe(&self, bucket: Bucket) -> broadcast::Receiver<ChangeEvent> {
        let mut channels = self.channels.write().await;

        if let Some(sender) = channels.get(&bucket) {
            sender.subscribe()
        } else {
            let (sender, receiver) = broadcast::channel(64);
            channels.insert(bucket, sender);
            receiver
        }
    }

    pub async fn broadcast(&self, event: ChangeEvent) {
        let channels = self.channels.read().await;

        if let Some(sender) = channels.get(&event.table) {
            // Ignore send errors (no subscribers)
            let _ = sender.send(event);
        }
    }
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self::new()
    }
}

pub(super) async fn subscribe(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(table): Path<String>,
) -> Result<Response, ApiError> {
    let bucket = parse_table(&table)?;
    // Subscribe before the upgrade so no write after the handshake is missed
    let receiver = state.hub.subscribe(bucket).await;
    Ok(ws.on_upgrade(move |socket| forward(socket, bucket, receiver)))
}

async fn forward(
    mut socket: WebSocket,
    bucket: Bucket,
    mut receiver: broadcast::Receiver<ChangeEvent>,
) {
    tracing::debug!("Realtime subscriber connected to {}", bucket);

    loop {
        tokio::select! {
            event = receiver.recv() => match event {
                Ok(event) => {
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::warn!("Failed to encode change event: {}", e);
                            continue;
                        }
                    };
                    if socket.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Realtime subscriber on {} lagged by {} events", bucket, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::debug!("Realtime subscriber left {}", bucket);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::ChangeKind;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_hub_subscribe_and_broadcast() {
        let hub = ChangeHub::new();
        let mut rx = hub.subscribe(Bucket::Checkins).await;

        let id = Uuid::new_v4();
        hub.broadcast(ChangeEvent::new(Bucket::Checkins, ChangeKind::Insert, id))
            .await;

        let event = rx.try_recv().unwrap();
        assert_eq!(event.id, id);
    }

    #[tokio::test]
    async fn test_hub_isolates_tables() {
        let hub = ChangeHub::new();
        let mut checkins = hub.subscribe(Bucket::Checkins).await;
        let mut incidents = hub.subscribe(Bucket::Incidents).await;

        hub.broadcast(ChangeEvent::new(
            Bucket::Incidents,
            ChangeKind::Delete,
            Uuid::new_v4(),
        ))
        .await;

        assert!(checkins.try_recv().is_err());
        assert!(incidents.try_recv().is_ok());
    }
}
