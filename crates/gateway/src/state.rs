//! Shared application state for the gateway

use std::sync::Arc;

use sqlx::SqlitePool;
use streamcast_database::{ChatMessageRepository, StreamRepository};
use streamcast_relay::StreamRelay;

/// State shared by the REST handlers and the WebSocket endpoint.
#[derive(Clone)]
pub struct GatewayState {
    relay: Arc<StreamRelay>,
    streams: StreamRepository,
    chat_history: ChatMessageRepository,
}

impl GatewayState {
    pub fn new(pool: SqlitePool, relay: Arc<StreamRelay>) -> Self {
        Self {
            relay,
            streams: StreamRepository::new(pool.clone()),
            chat_history: ChatMessageRepository::new(pool),
        }
    }

    pub fn relay(&self) -> &StreamRelay {
        &self.relay
    }

    pub fn streams(&self) -> &StreamRepository {
        &self.streams
    }

    pub fn chat_history(&self) -> &ChatMessageRepository {
        &self.chat_history
    }
}
