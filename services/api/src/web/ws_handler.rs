//! services/api/src/web/ws_handler.rs
//!
//! The WebSocket entry point. Each connection subscribes to marker and
//! preference changes and receives them as JSON text frames until it closes.

use crate::web::{
    protocol::{ClientMessage, ServerMessage},
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{
    stream::{self, SplitSink, StreamExt},
    SinkExt,
};
use std::sync::Arc;
use tracing::{error, info, warn};

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("New WebSocket connection established");

    let (mut sender, mut receiver) = socket.split();

    // Subscribe before anything else so no change published from here on is missed.
    let marker_events = app_state.markers.subscribe().map(ServerMessage::from);
    let preference_events = app_state.preferences.subscribe().map(ServerMessage::from);
    let mut events = stream::select(marker_events, preference_events);

    loop {
        tokio::select! {
            event = events.next() => {
                let Some(message) = event else {
                    info!("Change streams closed, ending connection");
                    break;
                };
                if send_message(&mut sender, &message).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        let reply = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Ping) => ServerMessage::Pong,
                            Err(e) => {
                                warn!("Ignoring malformed client message: {}", e);
                                ServerMessage::Error {
                                    message: format!("Unrecognised message: {}", e),
                                }
                            }
                        };
                        if send_message(&mut sender, &reply).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Client disconnected");
                        break;
                    }
                    // Ping/pong frames are answered by axum; binary frames carry nothing for us.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("WebSocket receive error: {}", e);
                        break;
                    }
                }
            }
        }
    }
}

async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> Result<(), ()> {
    let json = serde_json::to_string(message).map_err(|e| {
        error!("Failed to serialize {:?}: {}", message, e);
    })?;
    sender.send(Message::Text(json.into())).await.map_err(|e| {
        warn!("Failed to send WebSocket message: {}", e);
    })
}
