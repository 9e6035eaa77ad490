use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tonic::transport::Server;

use common::config::{ConfigManager, FileContentConfigProvider, Validate};
use common::proto::game_service_server::GameServiceServer;
use common::{ServerMessage, log, logger, proto, server_message};
use tictactoe_server::broadcaster::Broadcaster;
use tictactoe_server::connection_tracker::ConnectionTracker;
use tictactoe_server::games::SessionRng;
use tictactoe_server::games::tictactoe::TicTacToeSessionSettings;
use tictactoe_server::grpc_service::GrpcService;
use tictactoe_server::matchmaker::Matchmaker;
use tictactoe_server::message_handler::MessageHandler;
use tictactoe_server::server_config::ServerConfig;
use tictactoe_server::session_registry::SessionRegistry;
use tictactoe_server::web_server::run_web_server;

#[derive(Parser)]
#[command(name = "tictactoe_server")]
struct Args {
    #[arg(long, default_value = "server_config.yaml")]
    config: String,

    #[arg(long)]
    use_log_prefix: bool,

    #[arg(long)]
    web_address: Option<String>,

    #[arg(long)]
    grpc_address: Option<String>,
}

fn shutdown_requested(mut rx: watch::Receiver<bool>) -> impl Future<Output = ()> + Send + 'static {
    async move {
        let _ = rx.wait_for(|stop| *stop).await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let prefix = if args.use_log_prefix {
        Some("Server".to_string())
    } else {
        None
    };
    logger::init_logger(prefix);

    let config_manager: ConfigManager<FileContentConfigProvider, ServerConfig> =
        ConfigManager::from_yaml_file(&args.config);
    let mut config = config_manager.get_config()?;
    if let Some(address) = args.web_address {
        config.web_address = address;
    }
    if let Some(address) = args.grpc_address {
        config.grpc_address = address;
    }
    config.validate()?;
    log!("Loaded config from {}: {:?}", args.config, config);

    let broadcaster = Broadcaster::new();
    let registry = SessionRegistry::new(
        broadcaster.clone(),
        TicTacToeSessionSettings::from(&config),
        SessionRng::from_random(),
    );
    let matchmaker = Matchmaker::new(registry.clone(), broadcaster.clone(), SessionRng::from_random());
    let handler = MessageHandler::new(ConnectionTracker::new(), broadcaster.clone(), registry, matchmaker);

    let grpc_addr = config.grpc_address.parse()?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let web_server = tokio::spawn(run_web_server(
        handler.clone(),
        config.web_address.clone(),
        config.static_files_path.clone().map(PathBuf::from),
        shutdown_requested(shutdown_rx.clone()),
    ));

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log!("Failed to listen for Ctrl+C: {}", e);
            return;
        }

        log!("Shutdown signal received, notifying clients...");

        let shutdown_msg = ServerMessage {
            message: Some(server_message::Message::ServerShuttingDown(
                proto::ServerShuttingDownNotification {
                    message: "Server is shutting down".to_string(),
                },
            )),
        };
        broadcaster.broadcast_to_all(shutdown_msg).await;

        tokio::time::sleep(Duration::from_millis(200)).await;
        let _ = shutdown_tx.send(true);
    });

    log!("Tic-tac-toe gRPC server listening on {}", grpc_addr);

    Server::builder()
        .add_service(GameServiceServer::new(GrpcService::new(handler)))
        .serve_with_shutdown(grpc_addr, shutdown_requested(shutdown_rx))
        .await?;

    web_server.await??;

    log!("Server shut down gracefully");

    Ok(())
}
