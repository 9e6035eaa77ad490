use std::future::Future;
use std::path::PathBuf;
use axum::{
    Json, Router,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};
use common::log;

use crate::message_handler::{HealthStatus, MessageHandler};
use crate::ws_handler::handle_websocket;

#[derive(Clone)]
pub struct WebServerState {
    pub handler: MessageHandler,
}

pub fn build_router(handler: MessageHandler, static_files_path: Option<PathBuf>) -> Router {
    let state = WebServerState { handler };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/ws", get(ws_upgrade_handler))
        .route("/api/health", get(health_handler));

    if let Some(path) = static_files_path {
        log!("Serving static files from {}", path.display());
        router = router.fallback_service(ServeDir::new(path));
    }

    router.layer(cors).with_state(state)
}

pub async fn run_web_server(
    handler: MessageHandler,
    address: String,
    static_files_path: Option<PathBuf>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let app = build_router(handler, static_files_path);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    log!("Web server listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

async fn ws_upgrade_handler(
    ws: WebSocketUpgrade,
    State(state): State<WebServerState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state.handler))
}

async fn health_handler(State(state): State<WebServerState>) -> Json<HealthStatus> {
    Json(state.handler.health().await)
}
