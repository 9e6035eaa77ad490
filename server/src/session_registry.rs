use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use common::id_generator::generate_session_code;
use common::{ClientId, SessionId, log};

use crate::games::tictactoe::{
    ByMark, Difficulty, FollowUp, Outbound, SessionUpdate, TicTacToeSession,
    TicTacToeSessionSettings, calculate_move,
};
use crate::games::{GameEventSink, SessionRng};

pub type SharedSession = Arc<Mutex<TicTacToeSession>>;

/// Owns every live session and the client -> session mapping.
///
/// Lock order: a session lock may be held while taking the map locks or the
/// rng lock, never the other way round.
#[derive(Debug, Clone)]
pub struct SessionRegistry<S: GameEventSink> {
    sessions: Arc<Mutex<HashMap<SessionId, SharedSession>>>,
    client_to_session: Arc<Mutex<HashMap<ClientId, SessionId>>>,
    sink: S,
    settings: Arc<TicTacToeSessionSettings>,
    rng: Arc<Mutex<SessionRng>>,
}

impl<S: GameEventSink> SessionRegistry<S> {
    pub fn new(sink: S, settings: TicTacToeSessionSettings, rng: SessionRng) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            client_to_session: Arc::new(Mutex::new(HashMap::new())),
            sink,
            settings: Arc::new(settings),
            rng: Arc::new(Mutex::new(rng)),
        }
    }

    pub fn settings(&self) -> &TicTacToeSessionSettings {
        &self.settings
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn session_of(&self, client_id: &ClientId) -> Option<SessionId> {
        self.client_to_session.lock().await.get(client_id).cloned()
    }

    pub async fn session(&self, session_id: &SessionId) -> Option<SharedSession> {
        self.sessions.lock().await.get(session_id).cloned()
    }

    async fn session_for_client(&self, client_id: &ClientId) -> Option<SharedSession> {
        let session_id = self.session_of(client_id).await?;
        self.session(&session_id).await
    }

    pub async fn start_single_player(&self, client_id: &ClientId, size: usize, difficulty: Difficulty) {
        self.leave(client_id).await;

        let session_id = SessionId::single_player(client_id);
        let rng = self.rng.lock().await.fork();
        let shared = Arc::new(Mutex::new(TicTacToeSession::single_player(
            session_id.clone(),
            client_id.clone(),
            size,
            difficulty,
            rng,
        )));

        self.sessions
            .lock()
            .await
            .insert(session_id.clone(), shared.clone());
        self.client_to_session
            .lock()
            .await
            .insert(client_id.clone(), session_id.clone());

        log!(
            "[session:{}] Single-player session created: {}x{}, {:?}",
            session_id, size, size, difficulty
        );

        let session = shared.lock().await;
        self.dispatch(session.started_events()).await;
    }

    /// Both clients must already be free of other sessions.
    pub async fn create_multiplayer(
        &self,
        players: ByMark<ClientId>,
        display_names: ByMark<String>,
        size: usize,
    ) -> SessionId {
        let (session_id, shared) = {
            let mut sessions = self.sessions.lock().await;
            let mut rng = self.rng.lock().await;
            let session_id = loop {
                let candidate = SessionId::new(generate_session_code(rng.inner()));
                if !sessions.contains_key(&candidate) {
                    break candidate;
                }
            };
            let shared = Arc::new(Mutex::new(TicTacToeSession::multiplayer(
                session_id.clone(),
                players.clone(),
                display_names,
                size,
                rng.fork(),
            )));
            sessions.insert(session_id.clone(), shared.clone());
            (session_id, shared)
        };

        {
            let mut mapping = self.client_to_session.lock().await;
            mapping.insert(players.x.clone(), session_id.clone());
            mapping.insert(players.o.clone(), session_id.clone());
        }

        log!(
            "[session:{}] Multiplayer session created: {}x{}, X={}, O={}",
            session_id, size, size, players.x, players.o
        );

        let mut session = shared.lock().await;
        self.dispatch(session.started_events()).await;
        self.start_turn_timer(&mut session).await;

        session_id
    }

    pub async fn make_move(&self, client_id: &ClientId, cell_index: usize) {
        let Some(shared) = self.session_for_client(client_id).await else {
            log!("[client:{}] Move ignored: not in a session", client_id);
            return;
        };
        let mut session = shared.lock().await;
        match session.apply_move(client_id, cell_index) {
            Ok(update) => {
                if let Some(outcome) = session.game_state.outcome.as_ref() {
                    log!(
                        "[session:{}] Game over: {:?} ({:?})",
                        session.id, outcome.result, outcome.reason
                    );
                }
                self.complete(&mut session, update).await;
            }
            Err(e) => log!(
                "[session:{}] Rejected move {} from {}: {}",
                session.id, cell_index, client_id, e
            ),
        }
    }

    pub async fn vote_rematch(&self, client_id: &ClientId) {
        let Some(shared) = self.session_for_client(client_id).await else {
            log!("[client:{}] Rematch vote ignored: not in a session", client_id);
            return;
        };
        let mut session = shared.lock().await;
        match session.vote_rematch(client_id) {
            Ok(update) => {
                if update.follow_up == FollowUp::StartTurnTimer {
                    log!("[session:{}] Rematch started", session.id);
                }
                self.complete(&mut session, update).await;
            }
            Err(e) => log!(
                "[session:{}] Rejected rematch vote from {}: {}",
                session.id, client_id, e
            ),
        }
    }

    pub async fn post_chat(&self, client_id: &ClientId, text: &str) {
        let Some(shared) = self.session_for_client(client_id).await else {
            log!("[client:{}] Chat ignored: not in a session", client_id);
            return;
        };
        let mut session = shared.lock().await;
        match session.post_chat(client_id, text, self.settings.chat_max_length) {
            Ok(update) => self.dispatch(update.events).await,
            Err(e) => log!(
                "[session:{}] Rejected chat from {}: {}",
                session.id, client_id, e
            ),
        }
    }

    /// Drops the client's mapping; the session goes away with its last client.
    pub async fn leave(&self, client_id: &ClientId) {
        let Some(session_id) = self.client_to_session.lock().await.remove(client_id) else {
            return;
        };
        let Some(shared) = self.session(&session_id).await else {
            return;
        };

        let mut session = shared.lock().await;
        let update = session.leave(client_id);
        if !update.events.is_empty() {
            log!("[session:{}] {} left, opponent wins", session_id, client_id);
        }
        self.dispatch(update.events).await;

        let still_mapped = self
            .client_to_session
            .lock()
            .await
            .values()
            .any(|id| id == &session_id);
        if !still_mapped {
            session.cancel_pending_tasks();
            self.sessions.lock().await.remove(&session_id);
            log!("[session:{}] Session destroyed", session_id);
        }
    }

    async fn complete(&self, session: &mut TicTacToeSession, update: SessionUpdate) {
        self.dispatch(update.events).await;

        if !session.game_state.is_playing() {
            session.cancel_turn_timer();
            return;
        }

        match update.follow_up {
            FollowUp::None => {}
            FollowUp::StartTurnTimer => self.start_turn_timer(session).await,
            FollowUp::ScheduleBotMove => self.schedule_bot_move(session).await,
        }
    }

    async fn start_turn_timer(&self, session: &mut TicTacToeSession) {
        let timeout = self.settings.turn_timeout;
        let (epoch, events) = session.begin_turn_timer(timeout);
        self.dispatch(events).await;

        let registry = self.clone();
        let session_id = session.id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            registry.handle_turn_timeout(&session_id, epoch).await;
        });
        session.set_turn_timer(handle.abort_handle());
    }

    async fn handle_turn_timeout(&self, session_id: &SessionId, epoch: u64) {
        let Some(shared) = self.session(session_id).await else {
            return;
        };
        let mut session = shared.lock().await;
        match session.handle_turn_timeout(epoch) {
            Ok(update) => {
                session.release_turn_timer();
                log!(
                    "[session:{}] Turn timer expired, {:?} forfeits",
                    session_id,
                    session.game_state.current_mark
                );
                self.dispatch(update.events).await;
            }
            Err(e) => log!("[session:{}] Turn timer ignored: {}", session_id, e),
        }
    }

    async fn schedule_bot_move(&self, session: &mut TicTacToeSession) {
        let delay = {
            let min = self.settings.bot_delay_min.as_millis() as u64;
            let max = self.settings.bot_delay_max.as_millis() as u64;
            Duration::from_millis(self.rng.lock().await.random_range(min..=max))
        };

        let registry = self.clone();
        let session_id = session.id.clone();
        let epoch = session.epoch();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            registry.run_bot_move(&session_id, epoch).await;
        });
        session.set_bot_task(handle.abort_handle());
    }

    async fn run_bot_move(&self, session_id: &SessionId, epoch: u64) {
        let Some(shared) = self.session(session_id).await else {
            return;
        };

        let (input, mut rng) = match shared.lock().await.bot_input(epoch) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log!("[session:{}] Bot move skipped: {}", session_id, e);
                return;
            }
        };

        let index = match tokio::task::spawn_blocking(move || calculate_move(input, &mut rng)).await {
            Ok(Some(index)) => index,
            Ok(None) => {
                log!("[session:{}] Bot found no move", session_id);
                return;
            }
            Err(e) => {
                log!("[session:{}] Bot search failed: {}", session_id, e);
                return;
            }
        };

        let mut session = shared.lock().await;
        match session.apply_bot_move(epoch, index) {
            Ok(update) => {
                session.release_bot_task();
                self.dispatch(update.events).await;
                if let Some(outcome) = session.game_state.outcome.as_ref() {
                    log!(
                        "[session:{}] Game over: {:?} ({:?})",
                        session_id, outcome.result, outcome.reason
                    );
                }
            }
            Err(e) => log!("[session:{}] Bot move {} dropped: {}", session_id, index, e),
        }
    }

    async fn dispatch(&self, events: Vec<Outbound>) {
        for event in events {
            self.sink.send(&event.recipient, event.message).await;
        }
    }
}
