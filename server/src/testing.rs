use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use common::{ClientId, ServerMessage, server_message};

use crate::games::GameEventSink;
use crate::games::tictactoe::{Board, Mark, check_win};

/// In-memory sink that records every outbound message per recipient.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    sent: Arc<Mutex<Vec<(ClientId, ServerMessage)>>>,
    disconnected: Arc<Mutex<HashSet<ClientId>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn disconnect(&self, client_id: &ClientId) {
        self.disconnected.lock().unwrap().insert(client_id.clone());
    }

    pub fn messages_for(&self, client_id: &ClientId) -> Vec<server_message::Message> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(recipient, _)| recipient == client_id)
            .filter_map(|(_, message)| message.message.clone())
            .collect()
    }

    /// Returns and forgets the messages sent to `client_id`.
    pub fn take_for(&self, client_id: &ClientId) -> Vec<server_message::Message> {
        let messages = self.messages_for(client_id);
        self.sent
            .lock()
            .unwrap()
            .retain(|(recipient, _)| recipient != client_id);
        messages
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

impl GameEventSink for RecordingSink {
    async fn send(&self, recipient: &ClientId, message: ServerMessage) {
        self.sent.lock().unwrap().push((recipient.clone(), message));
    }

    async fn is_connected(&self, client_id: &ClientId) -> bool {
        !self.disconnected.lock().unwrap().contains(client_id)
    }
}

/// Exhaustive best move for `X` on a small board, lowest index on ties.
pub fn perfect_x_move(board: &mut Board) -> usize {
    fn score(board: &mut Board, to_move: Mark) -> i32 {
        if let Some(win) = check_win(board) {
            return if win.mark == Mark::X { 1 } else { -1 };
        }
        if board.is_full() {
            return 0;
        }
        let mut scores = Vec::new();
        for index in board.empty_cells() {
            board.set(index, Some(to_move));
            scores.push(score(board, to_move.opponent()));
            board.set(index, None);
        }
        if to_move == Mark::X {
            scores.into_iter().max().unwrap_or(0)
        } else {
            scores.into_iter().min().unwrap_or(0)
        }
    }

    let mut best: Option<(usize, i32)> = None;
    for index in board.empty_cells() {
        board.set(index, Some(Mark::X));
        let s = score(board, Mark::O);
        board.set(index, None);
        if best.is_none_or(|(_, best_score)| s > best_score) {
            best = Some((index, s));
        }
    }
    best.map(|(index, _)| index).expect("board is full")
}
