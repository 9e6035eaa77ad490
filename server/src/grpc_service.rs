use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tonic::{Request, Response, Status};

use common::proto::game_service_server::GameService;
use common::{ClientMessage, ServerMessage, log};

use crate::message_handler::{HandleResult, MessageHandler};

#[derive(Debug)]
pub struct GrpcService {
    handler: MessageHandler,
}

impl GrpcService {
    pub fn new(handler: MessageHandler) -> Self {
        Self { handler }
    }
}

#[tonic::async_trait]
impl GameService for GrpcService {
    type GameStreamStream = ReceiverStream<Result<ServerMessage, Status>>;

    async fn game_stream(
        &self,
        request: Request<tonic::Streaming<ClientMessage>>,
    ) -> Result<Response<Self::GameStreamStream>, Status> {
        let mut in_stream = request.into_inner();
        let (tx, rx) = mpsc::channel(128);
        let handler = self.handler.clone();

        tokio::spawn(async move {
            let client_id = handler.connect(tx).await;

            while let Some(result) = in_stream.next().await {
                match result {
                    Ok(client_message) => {
                        match handler.handle_message(&client_id, client_message).await {
                            HandleResult::Continue => {}
                            HandleResult::Disconnect => break,
                        }
                    }
                    Err(e) => {
                        log!("[client:{}] Stream error: {}", client_id, e);
                        break;
                    }
                }
            }

            log!("[client:{}] Stream ended", client_id);
            handler.handle_client_disconnected(&client_id).await;
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}
