pub mod broadcaster;
pub mod connection_tracker;
pub mod games;
pub mod grpc_service;
pub mod matchmaker;
pub mod message_handler;
pub mod server_config;
pub mod session_registry;
pub mod web_server;
pub mod ws_handler;

#[cfg(test)]
mod testing;
