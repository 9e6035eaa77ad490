pub mod proto {
    tonic::include_proto!("tictactoe");
}

pub mod config;
pub mod id_generator;
pub mod identifiers;
pub mod logger;
pub mod version;

pub use identifiers::*;
pub use proto::{ClientMessage, ServerMessage, client_message, server_message};
