//! WebSocket handler for the UI.
//!
//! Handles UI socket connections: registers them for collection and notice
//! updates, and dispatches actions sent over the socket to the session.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::session::SessionHandle;
use crate::websocket::{ClientMessage, ConnectionManager, ServerMessage};

use super::{handle_delete, handle_insert, InsertRequest};

/// Handle an established UI socket.
///
/// This function:
/// 1. Registers the connection with the manager
/// 2. Sends the current collection
/// 3. Processes incoming messages in a loop
/// 4. Cleans up on disconnect
pub async fn handle_websocket_connection(
    socket: WebSocket,
    session: SessionHandle,
    conn_manager: Arc<ConnectionManager>,
    client: String,
) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let conn_id = conn_manager.register(client.clone(), tx);
    conn_manager.send_to(&conn_id, ServerMessage::Collection(session.current()));

    tracing::info!(conn_id = %conn_id, client = %client, "UI connected");

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(text) => {
                    if let Err(e) = ws_sender.send(Message::Text(text.into())).await {
                        tracing::warn!("Failed to send WebSocket message: {}", e);
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to serialize WebSocket message: {}", e);
                }
            }
        }
    });

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let response = process_message(&text, &session).await;
                conn_manager.send_to(&conn_id, response);
            }
            Ok(Message::Binary(_)) => {
                tracing::warn!("Binary messages not supported");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                tracing::debug!(conn_id = %conn_id, "WebSocket close frame received");
                break;
            }
            Err(e) => {
                tracing::warn!(conn_id = %conn_id, "WebSocket error: {}", e);
                break;
            }
        }
    }

    conn_manager.unregister(&conn_id);
    send_task.abort();

    tracing::info!(
        conn_id = %conn_id,
        active_connections = conn_manager.connection_count(),
        "UI disconnected"
    );
}

/// Process a client message and return the direct response.
async fn process_message(text: &str, session: &SessionHandle) -> ServerMessage {
    let client_msg: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            return ServerMessage::error(format!("Invalid message format: {}", e), None);
        }
    };

    match client_msg {
        ClientMessage::Insert {
            title,
            url,
            request_id,
        } => match handle_insert(session, InsertRequest { title, url }).await {
            Ok(response) => ServerMessage::Submitted {
                pending: response.pending,
                request_id,
            },
            Err(e) => ServerMessage::error(e.to_string(), request_id),
        },

        ClientMessage::Delete { id, request_id } => match handle_delete(session, id).await {
            Ok(response) => ServerMessage::Submitted {
                pending: response.pending,
                request_id,
            },
            Err(e) => ServerMessage::error(e.to_string(), request_id),
        },

        ClientMessage::Ping => ServerMessage::Pong,
    }
}
