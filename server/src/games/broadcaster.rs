use std::future::Future;

use common::{ClientId, ServerMessage};

/// Outbound side of the session layer. Sends to unknown or closed
/// connections are dropped silently.
pub trait GameEventSink: Send + Sync + Clone + 'static {
    fn send(&self, recipient: &ClientId, message: ServerMessage) -> impl Future<Output = ()> + Send;

    fn is_connected(&self, client_id: &ClientId) -> impl Future<Output = bool> + Send;
}
