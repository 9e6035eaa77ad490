use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

use common::{ClientId, ServerMessage, SessionId, log, proto, server_message};

use crate::games::tictactoe::ByMark;
use crate::games::{GameEventSink, SessionRng};
use crate::session_registry::SessionRegistry;

pub const DEFAULT_X_NAME: &str = "Player 1";
pub const DEFAULT_O_NAME: &str = "Player 2";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitingEntry {
    pub client_id: ClientId,
    pub size: usize,
    pub display_name: Option<String>,
}

/// FIFO queue of clients waiting for an opponent with the same board size.
///
/// The queue lock is taken before any registry or session lock.
#[derive(Debug, Clone)]
pub struct Matchmaker<S: GameEventSink> {
    waiting: Arc<Mutex<VecDeque<WaitingEntry>>>,
    registry: SessionRegistry<S>,
    sink: S,
    rng: Arc<Mutex<SessionRng>>,
}

impl<S: GameEventSink> Matchmaker<S> {
    pub fn new(registry: SessionRegistry<S>, sink: S, rng: SessionRng) -> Self {
        Self {
            waiting: Arc::new(Mutex::new(VecDeque::new())),
            registry,
            sink,
            rng: Arc::new(Mutex::new(rng)),
        }
    }

    pub async fn waiting_count(&self) -> usize {
        self.waiting.lock().await.len()
    }

    /// Pairs the client with the oldest live entry of the same size, or
    /// queues it. Returns the new session id on a match.
    ///
    /// The queue stays locked until the session is registered, so a
    /// concurrent `remove_client` of either player finds the queue entry or
    /// the session mapping, never neither.
    pub async fn find_match(
        &self,
        client_id: &ClientId,
        size: usize,
        display_name: Option<String>,
    ) -> Option<SessionId> {
        self.registry.leave(client_id).await;

        let mut waiting = self.waiting.lock().await;
        waiting.retain(|entry| &entry.client_id != client_id);

        let opponent = loop {
            let position = waiting.iter().position(|entry| entry.size == size);
            let candidate = position.and_then(|position| waiting.remove(position));

            let Some(candidate) = candidate else {
                waiting.push_back(WaitingEntry {
                    client_id: client_id.clone(),
                    size,
                    display_name,
                });
                drop(waiting);

                log!("[client:{}] Waiting for a {}x{} opponent", client_id, size, size);
                self.sink
                    .send(
                        client_id,
                        ServerMessage {
                            message: Some(server_message::Message::WaitingForOpponent(
                                proto::WaitingForOpponent { size: size as u32 },
                            )),
                        },
                    )
                    .await;
                return None;
            };

            if self.sink.is_connected(&candidate.client_id).await {
                break candidate;
            }
            log!(
                "[client:{}] Discarded stale waiting entry for {}",
                client_id, candidate.client_id
            );
        };

        let requester = WaitingEntry {
            client_id: client_id.clone(),
            size,
            display_name,
        };
        let requester_is_x = self.rng.lock().await.random_bool();
        let (x, o) = if requester_is_x {
            (requester, opponent)
        } else {
            (opponent, requester)
        };

        log!(
            "[client:{}] Matched with {}, {} plays X",
            client_id, if requester_is_x { &o.client_id } else { &x.client_id }, x.client_id
        );

        let players = ByMark::new(x.client_id, o.client_id);
        let names = ByMark::new(
            x.display_name.unwrap_or_else(|| DEFAULT_X_NAME.to_string()),
            o.display_name.unwrap_or_else(|| DEFAULT_O_NAME.to_string()),
        );
        let session_id = self
            .registry
            .create_multiplayer(players.clone(), names, size)
            .await;

        for player in [&players.x, &players.o] {
            if !self.sink.is_connected(player).await {
                log!("[session:{}] {} dropped while being matched", session_id, player);
                self.registry.leave(player).await;
            }
        }
        drop(waiting);

        Some(session_id)
    }

    /// Replies `MatchmakingCancelled` only if the client was queued.
    pub async fn cancel(&self, client_id: &ClientId) {
        if !self.remove_client(client_id).await {
            return;
        }
        log!("[client:{}] Matchmaking cancelled", client_id);
        self.sink
            .send(
                client_id,
                ServerMessage {
                    message: Some(server_message::Message::MatchmakingCancelled(
                        proto::MatchmakingCancelled {},
                    )),
                },
            )
            .await;
    }

    pub async fn remove_client(&self, client_id: &ClientId) -> bool {
        let mut waiting = self.waiting.lock().await;
        let before = waiting.len();
        waiting.retain(|entry| &entry.client_id != client_id);
        waiting.len() != before
    }
}
