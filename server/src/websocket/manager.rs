//! UI connection manager.
//!
//! Tracks connected UI sockets so collection updates and notices can be
//! fanned out to all of them.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;

use super::ServerMessage;

/// Sender for WebSocket messages.
pub type MessageSender = mpsc::UnboundedSender<ServerMessage>;

/// A single UI connection.
#[derive(Debug)]
pub struct Connection {
    /// Who connected, for logs
    pub client: String,
    /// Channel to send messages to this connection
    pub sender: MessageSender,
}

/// Manages active UI connections.
///
/// Thread-safe and can be shared across handlers via `Arc`.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    connections: DashMap<String, Connection>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a new connection and return its id.
    pub fn register(&self, client: String, sender: MessageSender) -> String {
        let conn_id = uuid::Uuid::new_v4().to_string();

        self.connections.insert(
            conn_id.clone(),
            Connection {
                client,
                sender,
            },
        );

        tracing::debug!(conn_id = %conn_id, "UI connection registered");
        conn_id
    }

    pub fn unregister(&self, conn_id: &str) {
        if let Some((_, conn)) = self.connections.remove(conn_id) {
            tracing::debug!(conn_id = %conn_id, client = %conn.client, "UI connection unregistered");
        }
    }

    /// Send to every connection, dropping the ones whose socket is gone.
    ///
    /// Returns the number of connections that received the message.
    pub fn broadcast_all(&self, message: &ServerMessage) -> usize {
        let mut dead = Vec::new();
        let mut sent_count = 0;

        for entry in self.connections.iter() {
            if entry.value().sender.send(message.clone()).is_ok() {
                sent_count += 1;
            } else {
                dead.push(entry.key().clone());
            }
        }

        for conn_id in dead {
            self.unregister(&conn_id);
        }

        sent_count
    }

    /// Send a message to a specific connection.
    pub fn send_to(&self, conn_id: &str, message: ServerMessage) -> bool {
        self.connections
            .get(conn_id)
            .is_some_and(|conn| conn.sender.send(message).is_ok())
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_unregister() {
        let manager = ConnectionManager::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        let conn_id = manager.register("browser".to_string(), tx);
        assert_eq!(manager.connection_count(), 1);

        manager.unregister(&conn_id);
        assert_eq!(manager.connection_count(), 0);
    }

    #[test]
    fn test_broadcast_all_prunes_closed_connections() {
        let manager = ConnectionManager::new();

        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, rx2) = mpsc::unbounded_channel();

        manager.register("tab-1".to_string(), tx1);
        manager.register("tab-2".to_string(), tx2);
        drop(rx2);

        let sent = manager.broadcast_all(&ServerMessage::Pong);
        assert_eq!(sent, 1);
        assert!(matches!(rx1.try_recv().unwrap(), ServerMessage::Pong));
        assert_eq!(manager.connection_count(), 1);
    }

    #[test]
    fn test_send_to() {
        let manager = ConnectionManager::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let conn_id = manager.register("tab".to_string(), tx);

        assert!(manager.send_to(&conn_id, ServerMessage::Pong));
        assert!(!manager.send_to("missing", ServerMessage::Pong));
        assert!(rx.try_recv().is_ok());
    }
}
