mod board;
mod bot_controller;
mod game_state;
mod session;
mod settings;
mod types;
mod win_detector;

pub use board::Board;
pub use bot_controller::{BOT_MARK, BotInput, calculate_minimax_move, calculate_move, depth_limit};
pub use game_state::{MoveResult, TicTacToeGameState};
pub use session::{ChatEntry, FollowUp, Outbound, SessionUpdate, TicTacToeSession};
pub use settings::{DEFAULT_BOARD_SIZE, REMATCH_VOTES_NEEDED, TicTacToeSessionSettings};
pub use types::{
    ByMark, Cell, Difficulty, GameEndReason, GameKind, GameResult, GameStatus, Mark, Outcome,
    Participant, WinResult,
};
pub use win_detector::check_win;
