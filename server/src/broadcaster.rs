use tokio::sync::{mpsc, Mutex};
use std::collections::HashMap;
use std::sync::Arc;
use tonic::Status;
use common::{ClientId, ServerMessage, log};
use crate::games::GameEventSink;

pub type ClientSender = mpsc::Sender<Result<ServerMessage, Status>>;

#[derive(Clone)]
pub struct Broadcaster {
    clients: Arc<Mutex<HashMap<ClientId, ClientSender>>>,
}

impl std::fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster").finish()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn register(&self, client_id: ClientId, sender: ClientSender) {
        self.clients.lock().await.insert(client_id, sender);
    }

    pub async fn unregister(&self, client_id: &ClientId) {
        self.clients.lock().await.remove(client_id);
    }

    pub async fn broadcast_to_all(&self, message: ServerMessage) {
        let clients: Vec<_> = self
            .clients
            .lock()
            .await
            .iter()
            .map(|(client_id, sender)| (client_id.clone(), sender.clone()))
            .collect();
        for (client_id, sender) in clients {
            Self::deliver(&client_id, &sender, message.clone());
        }
    }

    /// A client whose channel is full loses the message instead of stalling
    /// every other sender.
    pub async fn send_to_client(&self, client_id: &ClientId, message: ServerMessage) {
        let sender = self.clients.lock().await.get(client_id).cloned();
        if let Some(sender) = sender {
            Self::deliver(client_id, &sender, message);
        }
    }

    fn deliver(client_id: &ClientId, sender: &ClientSender, message: ServerMessage) {
        if let Err(e) = sender.try_send(Ok(message)) {
            log!("Dropped message for client {}: {}", client_id, e);
        }
    }

    /// Registered and the receiving half of its channel is still alive.
    pub async fn is_connected(&self, client_id: &ClientId) -> bool {
        self.clients
            .lock()
            .await
            .get(client_id)
            .is_some_and(|sender| !sender.is_closed())
    }

    pub async fn client_count(&self) -> usize {
        self.clients.lock().await.len()
    }
}

impl GameEventSink for Broadcaster {
    async fn send(&self, recipient: &ClientId, message: ServerMessage) {
        self.send_to_client(recipient, message).await;
    }

    async fn is_connected(&self, client_id: &ClientId) -> bool {
        Broadcaster::is_connected(self, client_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{proto, server_message};

    fn pong() -> ServerMessage {
        ServerMessage {
            message: Some(server_message::Message::Pong(proto::PongResponse::default())),
        }
    }

    #[tokio::test]
    async fn test_send_reaches_registered_client_only() {
        let broadcaster = Broadcaster::new();
        let (tx, mut rx) = mpsc::channel(4);
        broadcaster.register(ClientId::new("a"), tx).await;

        broadcaster.send_to_client(&ClientId::new("a"), pong()).await;
        broadcaster.send_to_client(&ClientId::new("b"), pong()).await;

        assert_eq!(rx.recv().await.unwrap().unwrap(), pong());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_is_connected_tracks_channel_state() {
        let broadcaster = Broadcaster::new();
        let id = ClientId::new("a");
        assert!(!broadcaster.is_connected(&id).await);

        let (tx, rx) = mpsc::channel(4);
        broadcaster.register(id.clone(), tx).await;
        assert!(broadcaster.is_connected(&id).await);

        drop(rx);
        assert!(!broadcaster.is_connected(&id).await);

        broadcaster.unregister(&id).await;
        assert_eq!(broadcaster.client_count().await, 0);
    }

    #[tokio::test]
    async fn test_broadcast_to_all() {
        let broadcaster = Broadcaster::new();
        let (tx_a, mut rx_a) = mpsc::channel(4);
        let (tx_b, mut rx_b) = mpsc::channel(4);
        broadcaster.register(ClientId::new("a"), tx_a).await;
        broadcaster.register(ClientId::new("b"), tx_b).await;

        broadcaster.broadcast_to_all(pong()).await;
        assert!(rx_a.recv().await.is_some());
        assert!(rx_b.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_full_channel_drops_instead_of_blocking_others() {
        let broadcaster = Broadcaster::new();
        let (tx_slow, mut rx_slow) = mpsc::channel(1);
        let (tx_fast, mut rx_fast) = mpsc::channel(4);
        broadcaster.register(ClientId::new("slow"), tx_slow).await;
        broadcaster.register(ClientId::new("fast"), tx_fast).await;

        broadcaster.send_to_client(&ClientId::new("slow"), pong()).await;
        broadcaster.send_to_client(&ClientId::new("slow"), pong()).await;
        broadcaster.broadcast_to_all(pong()).await;
        broadcaster.send_to_client(&ClientId::new("fast"), pong()).await;

        assert_eq!(rx_fast.recv().await.unwrap().unwrap(), pong());
        assert_eq!(rx_fast.recv().await.unwrap().unwrap(), pong());
        assert!(rx_slow.recv().await.is_some());
        assert!(rx_slow.try_recv().is_err());
    }
}
