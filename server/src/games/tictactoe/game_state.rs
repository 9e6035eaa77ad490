use super::board::Board;
use super::types::{GameEndReason, GameStatus, Mark, Outcome};
use super::win_detector::check_win;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveResult {
    Continue,
    Finished(Outcome),
}

/// Board, turn and result of one round. Ownership of marks lives in the
/// session; this only knows about `X` and `O`.
#[derive(Debug, Clone)]
pub struct TicTacToeGameState {
    pub board: Board,
    pub current_mark: Mark,
    pub status: GameStatus,
    pub outcome: Option<Outcome>,
    pub last_move: Option<usize>,
    pub moves_made: usize,
}

impl TicTacToeGameState {
    pub fn new(size: usize) -> Self {
        Self {
            board: Board::new(size),
            current_mark: Mark::X,
            status: GameStatus::Playing,
            outcome: None,
            last_move: None,
            moves_made: 0,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.status == GameStatus::Playing
    }

    pub fn place_mark(&mut self, mark: Mark, index: usize) -> Result<MoveResult, String> {
        if self.status != GameStatus::Playing {
            return Err("Game is already over".to_string());
        }

        if mark != self.current_mark {
            return Err("Not your turn".to_string());
        }

        self.board.place(index, mark)?;
        self.last_move = Some(index);
        self.moves_made += 1;

        if let Some(win) = check_win(&self.board) {
            let outcome = Outcome::win(win);
            self.finish(outcome.clone());
            return Ok(MoveResult::Finished(outcome));
        }

        if self.board.is_full() {
            let outcome = Outcome::draw();
            self.finish(outcome.clone());
            return Ok(MoveResult::Finished(outcome));
        }

        self.current_mark = self.current_mark.opponent();
        Ok(MoveResult::Continue)
    }

    /// Ends the round in favour of the opponent of `loser`.
    pub fn forfeit(&mut self, loser: Mark, reason: GameEndReason) -> Result<Outcome, String> {
        if self.status != GameStatus::Playing {
            return Err("Game is already over".to_string());
        }
        let outcome = Outcome::forfeit(loser, reason);
        self.finish(outcome.clone());
        Ok(outcome)
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.board.size());
    }

    fn finish(&mut self, outcome: Outcome) {
        self.status = GameStatus::Finished;
        self.outcome = Some(outcome);
    }
}
