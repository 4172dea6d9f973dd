use crate::errors::{Error, Result};
use crate::metrics::VIEWER_CONNECTIONS;
use crate::state::AppState;
use crate::subscriptions::{ConnectionId, SubscriptionTable};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Messages a viewer may send
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ClientMessage {
    Subscribe {
        #[serde(rename = "deviceId")]
        device_id: String,
    },
}

pub fn parse_client_message(text: &str) -> Result<ClientMessage> {
    let message: ClientMessage =
        serde_json::from_str(text).map_err(|e| Error::Protocol(e.to_string()))?;
    match &message {
        ClientMessage::Subscribe { device_id } if device_id.trim().is_empty() => {
            Err(Error::Protocol("deviceId must not be empty".to_string()))
        }
        _ => Ok(message),
    }
}

/// Viewer socket. Clients send `{"action": "subscribe", "deviceId": "..."}`
/// and receive each matching reading as a JSON text frame.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.subscriptions))
}

async fn handle_socket(socket: WebSocket, subscriptions: Arc<SubscriptionTable>) {
    let conn_id = Uuid::new_v4();
    info!(conn_id = %conn_id, "Viewer connected");
    VIEWER_CONNECTIONS.inc();

    let mut rx = subscriptions.register(conn_id).await;
    let (mut sink, mut stream) = socket.split();

    // Writer: drain the outbound queue into the socket
    let writer_conn_id = conn_id;
    let send_task = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sink.send(Message::Text(text)).await.is_err() {
                debug!(conn_id = %writer_conn_id, "Viewer sink closed");
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => handle_text(&subscriptions, conn_id, &text).await,
            Ok(Message::Binary(bytes)) => match std::str::from_utf8(&bytes) {
                Ok(text) => handle_text(&subscriptions, conn_id, text).await,
                Err(_) => warn!(conn_id = %conn_id, "Ignoring non-UTF-8 binary message"),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(conn_id = %conn_id, error = %e, "Viewer receive error");
                break;
            }
        }
    }

    subscriptions.unsubscribe_all(conn_id).await;
    send_task.abort();
    VIEWER_CONNECTIONS.dec();
    info!(conn_id = %conn_id, "Viewer disconnected");
}

async fn handle_text(subscriptions: &SubscriptionTable, conn_id: ConnectionId, text: &str) {
    match parse_client_message(text) {
        Ok(ClientMessage::Subscribe { device_id }) => {
            if subscriptions.subscribe(conn_id, &device_id).await {
                info!(conn_id = %conn_id, device_id = %device_id, "Viewer subscribed");
            }
        }
        Err(e) => warn!(conn_id = %conn_id, error = %e, "Invalid viewer message"),
    }
}
