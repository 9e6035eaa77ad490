use common::id_generator::generate_connection_id;
use common::{ClientId, ClientMessage, ServerMessage, client_message, log, proto, server_message};

use crate::broadcaster::{Broadcaster, ClientSender};
use crate::connection_tracker::ConnectionTracker;
use crate::games::tictactoe::Difficulty;
use crate::matchmaker::Matchmaker;
use crate::session_registry::SessionRegistry;

/// Shared by the WebSocket and gRPC gateways; one clone per connection.
#[derive(Debug, Clone)]
pub struct MessageHandler {
    tracker: ConnectionTracker,
    broadcaster: Broadcaster,
    registry: SessionRegistry<Broadcaster>,
    matchmaker: Matchmaker<Broadcaster>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleResult {
    Continue,
    Disconnect,
}

impl MessageHandler {
    pub fn new(
        tracker: ConnectionTracker,
        broadcaster: Broadcaster,
        registry: SessionRegistry<Broadcaster>,
        matchmaker: Matchmaker<Broadcaster>,
    ) -> Self {
        Self {
            tracker,
            broadcaster,
            registry,
            matchmaker,
        }
    }

    /// Assigns a fresh connection id and starts routing events to `tx`.
    pub async fn connect(&self, tx: ClientSender) -> ClientId {
        let client_id = loop {
            let candidate = ClientId::new(generate_connection_id());
            if self.tracker.add_client(&candidate).await {
                break candidate;
            }
        };
        self.broadcaster.register(client_id.clone(), tx).await;
        log!("[client:{}] Connected", client_id);
        client_id
    }

    pub async fn handle_message(
        &self,
        client_id: &ClientId,
        client_message: ClientMessage,
    ) -> HandleResult {
        let server_version = common::version::get_version();
        if client_message.version != server_version {
            log!(
                "[client:{}] Version mismatch: client '{}', server '{}'",
                client_id, client_message.version, server_version
            );
            self.send(
                client_id,
                server_message::Message::Error(proto::ErrorResponse {
                    code: proto::ErrorCode::VersionMismatch.into(),
                    message: format!(
                        "Version mismatch: client version '{}', server version '{}'",
                        client_message.version, server_version
                    ),
                }),
            )
            .await;
            return HandleResult::Disconnect;
        }

        let Some(message) = client_message.message else {
            return HandleResult::Continue;
        };

        match message {
            client_message::Message::SetDisplayName(req) => {
                if let Some(name) = self.tracker.set_display_name(client_id, &req.name).await {
                    self.send(
                        client_id,
                        server_message::Message::DisplayNameConfirmed(proto::DisplayNameConfirmed {
                            name,
                        }),
                    )
                    .await;
                }
            }
            client_message::Message::StartSinglePlayer(req) => {
                let Some(size) = self.registry.settings().resolve_board_size(req.size) else {
                    log!("[client:{}] Unsupported board size {}", client_id, req.size);
                    return HandleResult::Continue;
                };
                self.matchmaker.remove_client(client_id).await;
                self.registry
                    .start_single_player(client_id, size, Difficulty::from_proto(req.difficulty))
                    .await;
            }
            client_message::Message::FindMultiplayerGame(req) => {
                let Some(size) = self.registry.settings().resolve_board_size(req.size) else {
                    log!("[client:{}] Unsupported board size {}", client_id, req.size);
                    return HandleResult::Continue;
                };
                let display_name = self.tracker.display_name(client_id).await;
                self.matchmaker.find_match(client_id, size, display_name).await;
            }
            client_message::Message::CancelMatchmaking(_) => {
                self.matchmaker.cancel(client_id).await;
            }
            client_message::Message::MakeMove(req) => {
                self.registry.make_move(client_id, req.cell_index as usize).await;
            }
            client_message::Message::VoteRematch(_) => {
                self.registry.vote_rematch(client_id).await;
            }
            client_message::Message::PostChat(req) => {
                self.registry.post_chat(client_id, &req.text).await;
            }
            client_message::Message::LeaveGame(_) => {
                self.registry.leave(client_id).await;
            }
            client_message::Message::Disconnect(_) => {
                log!("[client:{}] Requested disconnect", client_id);
                return HandleResult::Disconnect;
            }
            client_message::Message::Ping(req) => {
                self.send(
                    client_id,
                    server_message::Message::Pong(proto::PongResponse {
                        ping_id: req.ping_id,
                        client_timestamp_ms: req.client_timestamp_ms,
                    }),
                )
                .await;
            }
        }

        HandleResult::Continue
    }

    pub async fn handle_client_disconnected(&self, client_id: &ClientId) {
        self.matchmaker.remove_client(client_id).await;
        self.registry.leave(client_id).await;
        self.tracker.remove_client(client_id).await;
        self.broadcaster.unregister(client_id).await;
        log!("[client:{}] Disconnected", client_id);
    }

    pub async fn health(&self) -> HealthStatus {
        HealthStatus {
            status: "ok",
            games: self.registry.session_count().await,
            waiting_players: self.matchmaker.waiting_count().await,
        }
    }

    async fn send(&self, client_id: &ClientId, message: server_message::Message) {
        self.broadcaster
            .send_to_client(client_id, ServerMessage { message: Some(message) })
            .await;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: &'static str,
    pub games: usize,
    pub waiting_players: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use tonic::Status;
    use crate::games::SessionRng;
    use crate::games::tictactoe::TicTacToeSessionSettings;

    fn handler() -> MessageHandler {
        let broadcaster = Broadcaster::new();
        let registry = SessionRegistry::new(
            broadcaster.clone(),
            TicTacToeSessionSettings::default(),
            SessionRng::new(1),
        );
        let matchmaker = Matchmaker::new(registry.clone(), broadcaster.clone(), SessionRng::new(2));
        MessageHandler::new(ConnectionTracker::new(), broadcaster, registry, matchmaker)
    }

    fn request(message: client_message::Message) -> ClientMessage {
        ClientMessage {
            version: common::version::get_version().to_string(),
            message: Some(message),
        }
    }

    async fn connect(
        handler: &MessageHandler,
    ) -> (ClientId, mpsc::Receiver<Result<ServerMessage, Status>>) {
        let (tx, rx) = mpsc::channel(32);
        (handler.connect(tx).await, rx)
    }

    fn next(rx: &mut mpsc::Receiver<Result<ServerMessage, Status>>) -> server_message::Message {
        rx.try_recv()
            .expect("no message queued")
            .expect("status error")
            .message
            .expect("empty message")
    }

    #[tokio::test(start_paused = true)]
    async fn test_version_mismatch_disconnects() {
        let handler = handler();
        let (client_id, mut rx) = connect(&handler).await;
        let message = ClientMessage {
            version: "0.0.0-old".to_string(),
            message: None,
        };
        assert_eq!(handler.handle_message(&client_id, message).await, HandleResult::Disconnect);
        let server_message::Message::Error(error) = next(&mut rx) else {
            panic!("expected error");
        };
        assert_eq!(error.code, proto::ErrorCode::VersionMismatch as i32);
    }

    #[tokio::test(start_paused = true)]
    async fn test_display_name_is_confirmed() {
        let handler = handler();
        let (client_id, mut rx) = connect(&handler).await;
        let result = handler
            .handle_message(
                &client_id,
                request(client_message::Message::SetDisplayName(proto::SetDisplayNameRequest {
                    name: "  Neo ".to_string(),
                })),
            )
            .await;
        assert_eq!(result, HandleResult::Continue);
        let server_message::Message::DisplayNameConfirmed(confirmed) = next(&mut rx) else {
            panic!("expected DisplayNameConfirmed");
        };
        assert_eq!(confirmed.name, "Neo");
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_clients_are_matched_and_health_reports_it() {
        let handler = handler();
        let (alice, mut alice_rx) = connect(&handler).await;
        let (bob, mut bob_rx) = connect(&handler).await;
        let find = || {
            request(client_message::Message::FindMultiplayerGame(
                proto::FindMultiplayerGameRequest { size: 0 },
            ))
        };

        handler.handle_message(&alice, find()).await;
        assert!(matches!(next(&mut alice_rx), server_message::Message::WaitingForOpponent(_)));
        assert_eq!(handler.health().await.waiting_players, 1);

        handler.handle_message(&bob, find()).await;
        assert!(matches!(next(&mut alice_rx), server_message::Message::GameStarted(_)));
        assert!(matches!(next(&mut bob_rx), server_message::Message::GameStarted(_)));

        let health = handler.health().await;
        assert_eq!(health.games, 1);
        assert_eq!(health.waiting_players, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsupported_size_is_ignored() {
        let handler = handler();
        let (client_id, mut rx) = connect(&handler).await;
        handler
            .handle_message(
                &client_id,
                request(client_message::Message::StartSinglePlayer(
                    proto::StartSinglePlayerRequest {
                        size: 42,
                        difficulty: proto::Difficulty::Hard as i32,
                    },
                )),
            )
            .await;
        assert!(rx.try_recv().is_err());
        assert_eq!(handler.health().await.games, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_cleans_up_session_and_queue() {
        let handler = handler();
        let (alice, _alice_rx) = connect(&handler).await;
        let (bob, _bob_rx) = connect(&handler).await;

        handler
            .handle_message(
                &alice,
                request(client_message::Message::StartSinglePlayer(
                    proto::StartSinglePlayerRequest {
                        size: 3,
                        difficulty: proto::Difficulty::Easy as i32,
                    },
                )),
            )
            .await;
        handler
            .handle_message(
                &bob,
                request(client_message::Message::FindMultiplayerGame(
                    proto::FindMultiplayerGameRequest { size: 4 },
                )),
            )
            .await;

        let result = handler
            .handle_message(
                &alice,
                request(client_message::Message::Disconnect(proto::DisconnectRequest {})),
            )
            .await;
        assert_eq!(result, HandleResult::Disconnect);
        handler.handle_client_disconnected(&alice).await;
        handler.handle_client_disconnected(&bob).await;

        let health = handler.health().await;
        assert_eq!(health, HealthStatus { status: "ok", games: 0, waiting_players: 0 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_ping_echoes_id() {
        let handler = handler();
        let (client_id, mut rx) = connect(&handler).await;
        handler
            .handle_message(
                &client_id,
                request(client_message::Message::Ping(proto::PingRequest {
                    ping_id: 7,
                    client_timestamp_ms: 1234,
                })),
            )
            .await;
        let server_message::Message::Pong(pong) = next(&mut rx) else {
            panic!("expected Pong");
        };
        assert_eq!((pong.ping_id, pong.client_timestamp_ms), (7, 1234));
    }
}
