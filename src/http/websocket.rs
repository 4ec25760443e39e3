//! WebSocket echo handling for the demo server.
//!
//! # Responsibilities
//! - Complete the upgrade handshake with the client
//! - Echo text and binary frames back until the client closes
//!
//! # Design Decisions
//! - Security headers for the 101 response come from the layer, not here
//! - Ping/pong handled by axum

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;

pub async fn echo_handler(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(echo)
}

async fn echo(mut socket: WebSocket) {
    while let Some(frame) = socket.recv().await {
        let message = match frame {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(error = %e, "WebSocket receive failed");
                break;
            }
        };

        match message {
            Message::Text(_) | Message::Binary(_) => {
                if socket.send(message).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }
    tracing::debug!("WebSocket connection closed");
}
