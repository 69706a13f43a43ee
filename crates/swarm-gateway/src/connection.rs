use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// A connected WebSocket client.
#[derive(Debug)]
pub struct Connection {
    /// Connection id.
    pub id: Uuid,
    /// Outbound text frames.
    pub tx: mpsc::UnboundedSender<String>,
}

/// Active WebSocket connections, addressed by id or all at once.
pub struct ConnectionManager {
    connections: RwLock<HashMap<Uuid, Connection>>,
}

impl ConnectionManager {
    /// An empty, shareable manager.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a connection.
    pub async fn add(&self, conn: Connection) {
        let id = conn.id;
        self.connections.write().await.insert(id, conn);
        tracing::info!(connection_id = %id, "Connection added");
    }

    /// Forget a connection.
    pub async fn remove(&self, id: Uuid) {
        self.connections.write().await.remove(&id);
        tracing::info!(connection_id = %id, "Connection removed");
    }

    /// Send to one connection. Returns `false` if it is gone.
    pub async fn send_to(&self, id: Uuid, message: &str) -> bool {
        let conns = self.connections.read().await;
        conns
            .get(&id)
            .is_some_and(|conn| conn.tx.send(message.to_string()).is_ok())
    }

    /// Number of live connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send a message to every connected client.
    pub async fn broadcast(&self, message: &str) {
        let conns = self.connections.read().await;
        for conn in conns.values() {
            let _ = conn.tx.send(message.to_string());
        }
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_reaches_every_connection() {
        let manager = ConnectionManager::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let id1 = Uuid::new_v4();
        manager.add(Connection { id: id1, tx: tx1 }).await;
        manager.add(Connection { id: Uuid::new_v4(), tx: tx2 }).await;
        assert_eq!(manager.connection_count().await, 2);

        manager.broadcast("hello").await;
        assert_eq!(rx1.recv().await.unwrap(), "hello");
        assert_eq!(rx2.recv().await.unwrap(), "hello");

        assert!(manager.send_to(id1, "direct").await);
        assert_eq!(rx1.recv().await.unwrap(), "direct");

        manager.remove(id1).await;
        assert!(!manager.send_to(id1, "gone").await);
        assert_eq!(manager.connection_count().await, 1);
    }
}
