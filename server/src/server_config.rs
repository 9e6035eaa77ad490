use serde::{Deserialize, Serialize};

use common::config::Validate;

pub const MIN_BOARD_SIZE: usize = 3;
pub const MAX_BOARD_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub web_address: String,
    pub grpc_address: String,
    pub static_files_path: Option<String>,
    pub turn_timeout_ms: u64,
    pub bot_delay_min_ms: u64,
    pub bot_delay_max_ms: u64,
    pub chat_max_length: usize,
    pub allowed_board_sizes: Vec<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            web_address: "0.0.0.0:8080".to_string(),
            grpc_address: "[::1]:5001".to_string(),
            static_files_path: None,
            turn_timeout_ms: 35_000,
            bot_delay_min_ms: 500,
            bot_delay_max_ms: 1_000,
            chat_max_length: 200,
            allowed_board_sizes: vec![3, 4, 5, 6],
        }
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<(), String> {
        if self.web_address.trim().is_empty() {
            return Err("web_address must not be empty".to_string());
        }
        if self.grpc_address.trim().is_empty() {
            return Err("grpc_address must not be empty".to_string());
        }
        if self.turn_timeout_ms == 0 {
            return Err("turn_timeout_ms must be greater than zero".to_string());
        }
        if self.bot_delay_min_ms > self.bot_delay_max_ms {
            return Err(format!(
                "bot_delay_min_ms ({}) must not exceed bot_delay_max_ms ({})",
                self.bot_delay_min_ms, self.bot_delay_max_ms
            ));
        }
        if self.chat_max_length == 0 {
            return Err("chat_max_length must be greater than zero".to_string());
        }
        if self.allowed_board_sizes.is_empty() {
            return Err("allowed_board_sizes must not be empty".to_string());
        }
        if let Some(size) = self
            .allowed_board_sizes
            .iter()
            .find(|size| !(MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(*size))
        {
            return Err(format!(
                "board size {} is outside {}..={}",
                size, MIN_BOARD_SIZE, MAX_BOARD_SIZE
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(ServerConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "web_address: \"127.0.0.1:9000\"\nturn_timeout_ms: 10000\n";
        let config: ServerConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.web_address, "127.0.0.1:9000");
        assert_eq!(config.turn_timeout_ms, 10_000);
        assert_eq!(config.chat_max_length, 200);
        assert_eq!(config.allowed_board_sizes, vec![3, 4, 5, 6]);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = ServerConfig {
            bot_delay_min_ms: 2_000,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());

        config = ServerConfig {
            allowed_board_sizes: vec![3, 11],
            ..ServerConfig::default()
        };
        assert!(config.validate().unwrap_err().contains("11"));

        config = ServerConfig {
            turn_timeout_ms: 0,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());

        config = ServerConfig {
            allowed_board_sizes: Vec::new(),
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
