use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use prost::Message as ProstMessage;
use tokio::sync::mpsc;
use tonic::Status;

use common::{ClientMessage, ServerMessage, log};

use crate::message_handler::{HandleResult, MessageHandler};

pub async fn handle_websocket(socket: WebSocket, handler: MessageHandler) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let (tx, mut rx) = mpsc::channel::<Result<ServerMessage, Status>>(128);

    let send_task = tokio::spawn(async move {
        while let Some(result) = rx.recv().await {
            if let Ok(msg) = result {
                let buf = msg.encode_to_vec();
                if ws_sender.send(Message::Binary(buf.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    let client_id = handler.connect(tx).await;

    while let Some(result) = ws_receiver.next().await {
        let data = match result {
            Ok(Message::Binary(data)) => data,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                log!("[client:{}] WebSocket error: {}", client_id, e);
                break;
            }
        };

        let client_message = match ClientMessage::decode(data.as_ref()) {
            Ok(m) => m,
            Err(e) => {
                log!("[client:{}] Failed to decode ClientMessage: {}", client_id, e);
                continue;
            }
        };

        if handler.handle_message(&client_id, client_message).await == HandleResult::Disconnect {
            break;
        }
    }

    // Unregistering drops the last sender, so the send task flushes and ends.
    handler.handle_client_disconnected(&client_id).await;
    if let Err(e) = send_task.await {
        log!("[client:{}] WebSocket send task failed: {}", client_id, e);
    }
}
