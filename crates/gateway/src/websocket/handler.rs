//! WebSocket connection handling.
//!
//! Each socket is registered with the relay on upgrade; inbound text frames
//! are parsed as [`ClientEvent`]s and dispatched, outbound [`ServerEvent`]s
//! are drained from the relay's per-connection queue into the socket. When
//! either side closes, the relay reconciles all session state.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, warn};

use streamcast_relay::{ClientEvent, ServerEvent};

use crate::state::GatewayState;

pub async fn relay_websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<GatewayState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<GatewayState>) {
    let (mut ws_sender, mut receiver) = socket.split();
    let (conn_id, mut out_rx) = state.relay().connect().await;

    // Outbound pump: relay queue → socket. Ends when the relay unregisters
    // the connection (the queue closes) or the socket send fails.
    let sender_task = tokio::spawn(async move {
        while let Some(event) = out_rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(error) => {
                    warn!(%error, "failed to serialize server event");
                    continue;
                }
            };
            if ws_sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => {
                    if let Err(error) = state.relay().handle_event(&conn_id, event).await {
                        debug!(conn = %conn_id, %error, "client event rejected");
                        state
                            .relay()
                            .connections()
                            .send_to(
                                &conn_id,
                                ServerEvent::Error {
                                    message: error.to_string(),
                                },
                            )
                            .await;
                    }
                }
                Err(error) => {
                    warn!(conn = %conn_id, %error, "unparseable client event");
                    state
                        .relay()
                        .connections()
                        .send_to(
                            &conn_id,
                            ServerEvent::Error {
                                message: "invalid event format".to_string(),
                            },
                        )
                        .await;
                }
            },
            Ok(Message::Close(_)) => {
                debug!(conn = %conn_id, "client closed connection");
                break;
            }
            Err(error) => {
                debug!(conn = %conn_id, %error, "websocket receive error");
                break;
            }
            // Ping/pong/binary frames are ignored.
            _ => {}
        }
    }

    // Reconciliation unregisters the connection, which closes the outbound
    // queue and lets the sender task drain and exit on its own.
    state.relay().disconnect(&conn_id).await;
    let _ = sender_task.await;
    debug!(conn = %conn_id, "websocket handler finished");
}
