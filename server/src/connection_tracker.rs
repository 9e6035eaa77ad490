use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use common::ClientId;

pub const MAX_DISPLAY_NAME_LENGTH: usize = 32;

/// Connected clients and the display name each one chose, if any.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    clients: Arc<Mutex<HashMap<ClientId, Option<String>>>>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_client(&self, client_id: &ClientId) -> bool {
        let mut clients = self.clients.lock().await;
        if clients.contains_key(client_id) {
            return false;
        }
        clients.insert(client_id.clone(), None);
        true
    }

    pub async fn remove_client(&self, client_id: &ClientId) {
        self.clients.lock().await.remove(client_id);
    }

    pub async fn client_count(&self) -> usize {
        self.clients.lock().await.len()
    }

    /// Stores the normalized name and returns it, or `None` for an unknown client.
    pub async fn set_display_name(&self, client_id: &ClientId, requested: &str) -> Option<String> {
        let mut clients = self.clients.lock().await;
        let slot = clients.get_mut(client_id)?;
        let name = normalize_display_name(client_id, requested);
        *slot = Some(name.clone());
        Some(name)
    }

    pub async fn display_name(&self, client_id: &ClientId) -> Option<String> {
        self.clients.lock().await.get(client_id).cloned().flatten()
    }
}

fn normalize_display_name(client_id: &ClientId, requested: &str) -> String {
    let trimmed = requested.trim();
    if trimmed.is_empty() {
        let prefix: String = client_id.as_str().chars().take(4).collect();
        return format!("Player{}", prefix);
    }
    trimmed.chars().take(MAX_DISPLAY_NAME_LENGTH).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_client_rejects_duplicates() {
        let tracker = ConnectionTracker::new();
        let id = ClientId::new("abc123");
        assert!(tracker.add_client(&id).await);
        assert!(!tracker.add_client(&id).await);
        assert_eq!(tracker.client_count().await, 1);
        tracker.remove_client(&id).await;
        assert_eq!(tracker.client_count().await, 0);
    }

    #[tokio::test]
    async fn test_display_name_is_trimmed_and_capped() {
        let tracker = ConnectionTracker::new();
        let id = ClientId::new("abc123");
        tracker.add_client(&id).await;

        assert_eq!(tracker.display_name(&id).await, None);
        assert_eq!(
            tracker.set_display_name(&id, "  Alice  ").await,
            Some("Alice".to_string())
        );
        assert_eq!(tracker.display_name(&id).await, Some("Alice".to_string()));

        let long = "n".repeat(50);
        let name = tracker.set_display_name(&id, &long).await.unwrap();
        assert_eq!(name.len(), MAX_DISPLAY_NAME_LENGTH);
    }

    #[tokio::test]
    async fn test_empty_name_falls_back_to_id_prefix() {
        let tracker = ConnectionTracker::new();
        let id = ClientId::new("xYz9qwerty");
        tracker.add_client(&id).await;
        assert_eq!(
            tracker.set_display_name(&id, "   ").await,
            Some("PlayerxYz9".to_string())
        );
    }

    #[tokio::test]
    async fn test_unknown_client_cannot_set_name() {
        let tracker = ConnectionTracker::new();
        assert_eq!(tracker.set_display_name(&ClientId::new("ghost"), "Bob").await, None);
    }
}
