use std::time::Duration;

use crate::server_config::ServerConfig;

pub const REMATCH_VOTES_NEEDED: usize = 2;
pub const DEFAULT_BOARD_SIZE: usize = 3;

#[derive(Debug, Clone)]
pub struct TicTacToeSessionSettings {
    pub turn_timeout: Duration,
    pub bot_delay_min: Duration,
    pub bot_delay_max: Duration,
    pub chat_max_length: usize,
    pub allowed_board_sizes: Vec<usize>,
}

impl Default for TicTacToeSessionSettings {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

impl From<&ServerConfig> for TicTacToeSessionSettings {
    fn from(config: &ServerConfig) -> Self {
        Self {
            turn_timeout: Duration::from_millis(config.turn_timeout_ms),
            bot_delay_min: Duration::from_millis(config.bot_delay_min_ms),
            bot_delay_max: Duration::from_millis(config.bot_delay_max_ms),
            chat_max_length: config.chat_max_length,
            allowed_board_sizes: config.allowed_board_sizes.clone(),
        }
    }
}

impl TicTacToeSessionSettings {
    /// Zero means "not specified" and maps to the default size.
    pub fn resolve_board_size(&self, requested: u32) -> Option<usize> {
        let size = if requested == 0 {
            DEFAULT_BOARD_SIZE
        } else {
            requested as usize
        };
        self.allowed_board_sizes.contains(&size).then_some(size)
    }
}
