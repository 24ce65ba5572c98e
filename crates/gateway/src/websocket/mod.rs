//! WebSocket endpoint feeding the stream relay

pub mod handler;

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::state::GatewayState;

/// Create all WebSocket routes
pub fn create_websocket_routes() -> Router<Arc<GatewayState>> {
    Router::new().route("/ws", get(handler::relay_websocket_handler))
}

pub use handler::*;
