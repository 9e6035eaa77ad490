use std::collections::HashSet;
use std::time::Duration;

use tokio::task::AbortHandle;
use tokio::time::Instant;

use common::{ClientId, ServerMessage, SessionId, proto, server_message};
use crate::games::SessionRng;
use super::bot_controller::BotInput;
use super::game_state::{MoveResult, TicTacToeGameState};
use super::settings::REMATCH_VOTES_NEEDED;
use super::types::{ByMark, Difficulty, GameKind, GameEndReason, Mark, Outcome, Participant};

pub const SINGLE_PLAYER_HUMAN_NAME: &str = "You";
pub const BOT_NAME: &str = "Bot";

#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub recipient: ClientId,
    pub message: ServerMessage,
}

/// Scheduling the registry has to do after an accepted transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FollowUp {
    #[default]
    None,
    StartTurnTimer,
    ScheduleBotMove,
}

#[derive(Debug, Default)]
pub struct SessionUpdate {
    pub events: Vec<Outbound>,
    pub follow_up: FollowUp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub sender: String,
    pub text: String,
    pub timestamp_ms: i64,
}

/// Authoritative state of one game.
///
/// Every transition that must invalidate scheduled work (a move, a timeout,
/// a leave, a rematch) bumps `epoch`. Timer and bot tasks capture the epoch
/// they were scheduled at and are rejected once it no longer matches.
#[derive(Debug)]
pub struct TicTacToeSession {
    pub id: SessionId,
    pub kind: GameKind,
    pub difficulty: Option<Difficulty>,
    pub game_state: TicTacToeGameState,
    participants: ByMark<Participant>,
    display_names: ByMark<String>,
    epoch: u64,
    rematch_votes: HashSet<ClientId>,
    departed: HashSet<ClientId>,
    chat_log: Vec<ChatEntry>,
    turn_deadline: Option<Instant>,
    turn_timer: Option<AbortHandle>,
    bot_task: Option<AbortHandle>,
    rng: SessionRng,
}

impl TicTacToeSession {
    pub fn single_player(
        id: SessionId,
        client_id: ClientId,
        size: usize,
        difficulty: Difficulty,
        rng: SessionRng,
    ) -> Self {
        Self::new(
            id,
            GameKind::SinglePlayer,
            Some(difficulty),
            size,
            ByMark::new(Participant::Human(client_id), Participant::Bot),
            ByMark::new(SINGLE_PLAYER_HUMAN_NAME.to_string(), BOT_NAME.to_string()),
            rng,
        )
    }

    pub fn multiplayer(
        id: SessionId,
        players: ByMark<ClientId>,
        display_names: ByMark<String>,
        size: usize,
        rng: SessionRng,
    ) -> Self {
        debug_assert_ne!(players.x, players.o, "a client cannot play against itself");
        Self::new(
            id,
            GameKind::Multiplayer,
            None,
            size,
            ByMark::new(Participant::Human(players.x), Participant::Human(players.o)),
            display_names,
            rng,
        )
    }

    fn new(
        id: SessionId,
        kind: GameKind,
        difficulty: Option<Difficulty>,
        size: usize,
        participants: ByMark<Participant>,
        display_names: ByMark<String>,
        rng: SessionRng,
    ) -> Self {
        Self {
            id,
            kind,
            difficulty,
            game_state: TicTacToeGameState::new(size),
            participants,
            display_names,
            epoch: 0,
            rematch_votes: HashSet::new(),
            departed: HashSet::new(),
            chat_log: Vec::new(),
            turn_deadline: None,
            turn_timer: None,
            bot_task: None,
            rng,
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_multiplayer(&self) -> bool {
        self.kind == GameKind::Multiplayer
    }

    pub fn participants(&self) -> &ByMark<Participant> {
        &self.participants
    }

    pub fn display_names(&self) -> &ByMark<String> {
        &self.display_names
    }

    pub fn chat_log(&self) -> &[ChatEntry] {
        &self.chat_log
    }

    pub fn rematch_vote_count(&self) -> usize {
        self.rematch_votes.len()
    }

    pub fn turn_deadline(&self) -> Option<Instant> {
        self.turn_deadline
    }

    pub fn mark_of(&self, client_id: &ClientId) -> Option<Mark> {
        self.participants
            .mark_of(&Participant::Human(client_id.clone()))
    }

    pub fn started_events(&self) -> Vec<Outbound> {
        self.per_participant(|mark| {
            server_message::Message::GameStarted(proto::GameStarted {
                session_id: self.id.to_string(),
                board: Some(self.game_state.board.to_proto()),
                current_mark: self.game_state.current_mark.to_proto(),
                your_mark: mark.to_proto(),
                display_names: Some(self.display_names_proto()),
                kind: self.kind.to_proto(),
            })
        })
    }

    pub fn apply_move(&mut self, client_id: &ClientId, index: usize) -> Result<SessionUpdate, String> {
        let mark = self.mark_of(client_id).ok_or("Not a participant")?;
        self.place(mark, index)
    }

    /// Snapshot for the bot search, or an error if the task is stale.
    pub fn bot_input(&mut self, epoch: u64) -> Result<(BotInput, SessionRng), String> {
        self.check_epoch(epoch)?;
        if *self.participants.get(self.game_state.current_mark) != Participant::Bot {
            return Err("Not the bot's turn".to_string());
        }
        let difficulty = self.difficulty.ok_or("Session has no bot difficulty")?;
        Ok((
            BotInput::new(&self.game_state.board, difficulty),
            self.rng.fork(),
        ))
    }

    pub fn apply_bot_move(&mut self, epoch: u64, index: usize) -> Result<SessionUpdate, String> {
        self.check_epoch(epoch)?;
        let mark = self.game_state.current_mark;
        if *self.participants.get(mark) != Participant::Bot {
            return Err("Not the bot's turn".to_string());
        }
        self.place(mark, index)
    }

    fn place(&mut self, mark: Mark, index: usize) -> Result<SessionUpdate, String> {
        let result = self.game_state.place_mark(mark, index)?;
        self.epoch += 1;

        match result {
            MoveResult::Finished(outcome) => {
                self.turn_deadline = None;
                Ok(SessionUpdate {
                    events: self.to_all(self.game_over_message(&outcome)),
                    follow_up: FollowUp::None,
                })
            }
            MoveResult::Continue => {
                let current_mark = self.game_state.current_mark;
                let events = self.to_all(server_message::Message::MoveApplied(proto::MoveApplied {
                    board: Some(self.game_state.board.to_proto()),
                    current_mark: current_mark.to_proto(),
                    last_move_index: index as u32,
                }));
                let follow_up = match self.kind {
                    GameKind::Multiplayer => FollowUp::StartTurnTimer,
                    GameKind::SinglePlayer
                        if *self.participants.get(current_mark) == Participant::Bot =>
                    {
                        FollowUp::ScheduleBotMove
                    }
                    GameKind::SinglePlayer => FollowUp::None,
                };
                Ok(SessionUpdate { events, follow_up })
            }
        }
    }

    /// Arms the turn deadline and returns the epoch the timer must present.
    pub fn begin_turn_timer(&mut self, duration: Duration) -> (u64, Vec<Outbound>) {
        self.turn_deadline = Some(Instant::now() + duration);
        let events = self.to_all(server_message::Message::TurnTimerStarted(
            proto::TurnTimerStarted {
                duration_ms: duration.as_millis() as u64,
            },
        ));
        (self.epoch, events)
    }

    pub fn handle_turn_timeout(&mut self, epoch: u64) -> Result<SessionUpdate, String> {
        self.check_epoch(epoch)?;
        if !self.is_multiplayer() {
            return Err("Turn timer on a single-player session".to_string());
        }
        let loser = self.game_state.current_mark;
        let outcome = self.game_state.forfeit(loser, GameEndReason::Timeout)?;
        self.epoch += 1;
        self.turn_deadline = None;
        Ok(SessionUpdate {
            events: self.to_all(self.game_over_message(&outcome)),
            follow_up: FollowUp::None,
        })
    }

    pub fn vote_rematch(&mut self, client_id: &ClientId) -> Result<SessionUpdate, String> {
        if !self.is_multiplayer() {
            return Err("Rematch is multiplayer only".to_string());
        }
        if self.game_state.is_playing() {
            return Err("Game still in progress".to_string());
        }
        if self.mark_of(client_id).is_none() {
            return Err("Not a participant".to_string());
        }

        self.rematch_votes.insert(client_id.clone());
        let mut events = self.to_all(server_message::Message::RematchVoteCount(
            proto::RematchVoteCount {
                votes: self.rematch_votes.len() as u32,
                needed: REMATCH_VOTES_NEEDED as u32,
            },
        ));

        if self.rematch_votes.len() < REMATCH_VOTES_NEEDED {
            return Ok(SessionUpdate {
                events,
                follow_up: FollowUp::None,
            });
        }

        self.restart();
        events.extend(self.per_participant(|mark| {
            server_message::Message::GameRestarted(proto::GameRestarted {
                board: Some(self.game_state.board.to_proto()),
                current_mark: self.game_state.current_mark.to_proto(),
                your_mark: mark.to_proto(),
                display_names: Some(self.display_names_proto()),
            })
        }));
        Ok(SessionUpdate {
            events,
            follow_up: FollowUp::StartTurnTimer,
        })
    }

    /// New round with swapped marks so the previous second mover opens.
    fn restart(&mut self) {
        self.game_state.reset();
        self.participants.swap();
        self.display_names.swap();
        self.rematch_votes.clear();
        self.epoch += 1;
    }

    pub fn post_chat(
        &mut self,
        client_id: &ClientId,
        text: &str,
        max_length: usize,
    ) -> Result<SessionUpdate, String> {
        if !self.is_multiplayer() {
            return Err("Chat is multiplayer only".to_string());
        }
        if !self.game_state.is_playing() {
            return Err("Game is already over".to_string());
        }
        let mark = self.mark_of(client_id).ok_or("Not a participant")?;

        let entry = ChatEntry {
            sender: self.display_names.get(mark).clone(),
            text: text.chars().take(max_length).collect(),
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
        };
        let events = self.to_all(server_message::Message::ChatMessage(proto::ChatMessage {
            sender: entry.sender.clone(),
            text: entry.text.clone(),
            timestamp_ms: entry.timestamp_ms,
        }));
        self.chat_log.push(entry);

        Ok(SessionUpdate {
            events,
            follow_up: FollowUp::None,
        })
    }

    /// A leaving player forfeits a running multiplayer round. The caller
    /// still has to drop the client's registry mapping.
    pub fn leave(&mut self, client_id: &ClientId) -> SessionUpdate {
        let Some(mark) = self.mark_of(client_id) else {
            return SessionUpdate::default();
        };

        self.departed.insert(client_id.clone());
        self.epoch += 1;
        self.turn_deadline = None;
        self.cancel_pending_tasks();

        if !self.is_multiplayer() {
            return SessionUpdate::default();
        }

        match self.game_state.forfeit(mark, GameEndReason::OpponentLeft) {
            Ok(outcome) => SessionUpdate {
                events: self.to_all(server_message::Message::OpponentLeft(proto::OpponentLeft {
                    winner: outcome.winner().map_or(proto::Mark::Empty as i32, Mark::to_proto),
                })),
                follow_up: FollowUp::None,
            },
            Err(_) => SessionUpdate::default(),
        }
    }

    /// Replaces the pending turn timer, aborting the previous one.
    pub fn set_turn_timer(&mut self, handle: AbortHandle) {
        if let Some(previous) = self.turn_timer.replace(handle) {
            previous.abort();
        }
    }

    pub fn set_bot_task(&mut self, handle: AbortHandle) {
        if let Some(previous) = self.bot_task.replace(handle) {
            previous.abort();
        }
    }

    /// Called by a task that has fired; it must not abort itself.
    pub fn release_turn_timer(&mut self) {
        self.turn_timer = None;
    }

    pub fn release_bot_task(&mut self) {
        self.bot_task = None;
    }

    pub fn cancel_turn_timer(&mut self) {
        if let Some(handle) = self.turn_timer.take() {
            handle.abort();
        }
    }

    pub fn cancel_pending_tasks(&mut self) {
        self.cancel_turn_timer();
        if let Some(handle) = self.bot_task.take() {
            handle.abort();
        }
    }

    fn check_epoch(&self, epoch: u64) -> Result<(), String> {
        if epoch != self.epoch {
            return Err(format!("Stale task (epoch {} != {})", epoch, self.epoch));
        }
        if !self.game_state.is_playing() {
            return Err("Game is already over".to_string());
        }
        Ok(())
    }

    fn game_over_message(&self, outcome: &Outcome) -> server_message::Message {
        server_message::Message::GameOver(proto::GameOver {
            draw: outcome.winner().is_none(),
            winner: outcome.winner().map_or(proto::Mark::Empty as i32, Mark::to_proto),
            reason: outcome.reason.to_proto(),
            winning_line: outcome
                .winning_line
                .iter()
                .flatten()
                .map(|&index| index as u32)
                .collect(),
            board: Some(self.game_state.board.to_proto()),
        })
    }

    fn display_names_proto(&self) -> proto::DisplayNames {
        proto::DisplayNames {
            x: self.display_names.x.clone(),
            o: self.display_names.o.clone(),
        }
    }

    fn recipients(&self) -> impl Iterator<Item = (Mark, &ClientId)> {
        self.participants
            .iter()
            .filter_map(|(mark, participant)| participant.client_id().map(|id| (mark, id)))
            .filter(|(_, id)| !self.departed.contains(*id))
    }

    fn to_all(&self, message: server_message::Message) -> Vec<Outbound> {
        self.recipients()
            .map(|(_, id)| Outbound {
                recipient: id.clone(),
                message: ServerMessage {
                    message: Some(message.clone()),
                },
            })
            .collect()
    }

    fn per_participant(&self, build: impl Fn(Mark) -> server_message::Message) -> Vec<Outbound> {
        self.recipients()
            .map(|(mark, id)| Outbound {
                recipient: id.clone(),
                message: ServerMessage {
                    message: Some(build(mark)),
                },
            })
            .collect()
    }
}
