//! WebSocket event stream: replay `feedHistory` then forward live events
//! (§4.F, §4.G "WS frames are JSON objects `{type, data}`"). Structurally the
//! same split-sender/split-receiver, two-task shape as the teacher's
//! `websocket.rs`, but there's no inbound subscription protocol to parse —
//! every connection gets the whole feed, so the receive side only needs to
//! watch for the client closing the socket.
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use keeper_types::Event;
use tracing::{debug, info};

use crate::state::ApiState;

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<ApiState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: ApiState) {
    let (mut sender, mut receiver) = socket.split();
    let (history, mut events) = state.event_bus.subscribe().await;

    if send_event(&mut sender, &history).await.is_err() {
        return;
    }

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    });

    let mut send_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if send_event(&mut sender, &event).await.is_err() {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "ws subscriber lagged, dropping connection");
                    break;
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!("websocket connection closed");
}

async fn send_event(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    event: &Event,
) -> Result<(), axum::Error> {
    let frame = serde_json::json!({ "type": event.tag(), "data": event });
    let text = serde_json::to_string(&frame).expect("Event always serializes");
    sender.send(Message::Text(text)).await
}
