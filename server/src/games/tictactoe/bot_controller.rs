use crate::games::SessionRng;
use super::board::Board;
use super::types::{Difficulty, Mark};
use super::win_detector::check_win;

/// The bot always plays `O`; humans open as `X`.
pub const BOT_MARK: Mark = Mark::O;

const WIN_SCORE: i32 = 10;
const FULL_DEPTH: usize = 9;
const LARGE_BOARD_DEPTH: usize = 4;

/// A disposable copy of the position the bot should answer.
#[derive(Debug, Clone)]
pub struct BotInput {
    pub board: Board,
    pub difficulty: Difficulty,
}

impl BotInput {
    pub fn new(board: &Board, difficulty: Difficulty) -> Self {
        Self {
            board: board.clone(),
            difficulty,
        }
    }
}

/// Returns `None` only when the board is full.
pub fn calculate_move(input: BotInput, rng: &mut SessionRng) -> Option<usize> {
    match input.difficulty {
        Difficulty::Easy => calculate_random_move(&input.board, rng),
        Difficulty::Medium => {
            if rng.chance(0.5) {
                calculate_random_move(&input.board, rng)
            } else {
                calculate_minimax_move(input.board)
            }
        }
        Difficulty::Hard => calculate_minimax_move(input.board),
    }
}

fn calculate_random_move(board: &Board, rng: &mut SessionRng) -> Option<usize> {
    rng.choose(&board.empty_cells()).copied()
}

pub fn depth_limit(size: usize) -> usize {
    if size <= 3 { FULL_DEPTH } else { LARGE_BOARD_DEPTH }
}

/// Best move for `BOT_MARK`. Ties go to the lowest index.
pub fn calculate_minimax_move(mut board: Board) -> Option<usize> {
    let max_depth = depth_limit(board.size());

    let mut best_move = None;
    let mut best_score = i32::MIN;

    for index in board.empty_cells() {
        board.set(index, Some(BOT_MARK));
        let score = minimax(&mut board, 0, max_depth, false, i32::MIN, i32::MAX);
        board.set(index, None);

        if score > best_score {
            best_score = score;
            best_move = Some(index);
        }
    }

    best_move
}

fn minimax(
    board: &mut Board,
    depth: usize,
    max_depth: usize,
    is_maximizing: bool,
    mut alpha: i32,
    mut beta: i32,
) -> i32 {
    if let Some(win) = check_win(board) {
        return if win.mark == BOT_MARK {
            WIN_SCORE - depth as i32
        } else {
            depth as i32 - WIN_SCORE
        };
    }

    if board.is_full() || depth >= max_depth {
        return 0;
    }

    if is_maximizing {
        let mut max_eval = i32::MIN;
        for index in board.empty_cells() {
            board.set(index, Some(BOT_MARK));
            let eval = minimax(board, depth + 1, max_depth, false, alpha, beta);
            board.set(index, None);

            max_eval = max_eval.max(eval);
            alpha = alpha.max(eval);
            if beta <= alpha {
                break;
            }
        }
        max_eval
    } else {
        let opponent_mark = BOT_MARK.opponent();
        let mut min_eval = i32::MAX;
        for index in board.empty_cells() {
            board.set(index, Some(opponent_mark));
            let eval = minimax(board, depth + 1, max_depth, true, alpha, beta);
            board.set(index, None);

            min_eval = min_eval.min(eval);
            beta = beta.min(eval);
            if beta <= alpha {
                break;
            }
        }
        min_eval
    }
}
