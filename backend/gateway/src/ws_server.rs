//! WebSocket entrypoint and connection handler.
//!
//! Checks the origin policy, upgrades HTTP to WS and runs one reader and one
//! writer task per connection.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use futures::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use relay_core::{Connection, ConnectionRef};

use crate::connection::{Outbound, WsConnection};
use crate::server::GatewayState;

const BINARY_UNSUPPORTED: &str = "Binary messages not supported";

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<GatewayState>,
) -> Response {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok());
    if !state.origins.allows(origin) {
        warn!(origin = ?origin, "Rejected WebSocket upgrade from disallowed origin");
        return StatusCode::FORBIDDEN.into_response();
    }
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: GatewayState) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Outbound>(state.send_buffer);

    let conn = Arc::new(WsConnection::new(Uuid::new_v4().to_string(), tx));
    let handle: ConnectionRef = conn.clone();
    let registry = state.router.registry().clone();
    registry.on_connect(&handle);
    info!(connection_id = conn.id(), "WebSocket connection established");

    // Drain queued frames into the socket.
    let writer_conn = conn.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let (msg, last) = match outbound {
                Outbound::Text(frame) => (Message::Text(frame), false),
                Outbound::Close { code, reason } => (
                    Message::Close(Some(CloseFrame {
                        code,
                        reason: reason.into(),
                    })),
                    true,
                ),
            };
            if let Err(e) = sender.send(msg).await {
                debug!(connection_id = writer_conn.id(), error = %e, "WebSocket write failed");
                break;
            }
            if last {
                break;
            }
        }
        writer_conn.mark_closed();
    });

    // Frames of one connection are routed strictly in arrival order.
    let router = state.router.clone();
    let reader_conn = conn.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => router.handle_text(&handle, &text),
                Ok(Message::Binary(_)) => {
                    warn!(connection_id = reader_conn.id(), "{BINARY_UNSUPPORTED}");
                    reader_conn.close_with(close_code::UNSUPPORTED, BINARY_UNSUPPORTED);
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {} // ping/pong are answered by axum
                Err(e) => {
                    debug!(connection_id = reader_conn.id(), error = %e, "WebSocket read failed");
                    break;
                }
            }
        }
    });

    // If either task exits, abort the other and wait for it to stop so no
    // frame is still being routed when the registry entry is torn down.
    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
            let _ = recv_task.await;
        }
        _ = (&mut recv_task) => {
            send_task.abort();
            let _ = send_task.await;
        }
    }

    conn.mark_closed();
    let channels = registry.disconnect(conn.id());
    info!(connection_id = conn.id(), channels, "WebSocket connection closed");
}
