//! Streamcast Database Crate
//!
//! Persistence collaborator for the streaming backend: connection
//! management, migrations, and repositories for stream records and chat
//! history. All writes coming from the relay are best-effort; callers treat
//! failures as log-and-continue.

use sqlx::SqlitePool;
use streamcast_config::DatabaseConfig;

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repos;
pub mod types;

pub use connection::prepare_database;
pub use migrations::run_migrations;

pub use repos::{ChatMessageRepository, StreamRepository};

pub use entities::{
    generate_stream_id, generate_stream_key, ChatMessageRecord, CreateStreamRequest,
    StreamCategory, StreamRecord,
};

pub use types::{
    errors::{ChatHistoryError, DatabaseError, StreamError},
    ChatHistoryResult, DatabaseResult, StreamResult,
};

/// Initialize the database with migrations
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    run_migrations(&pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;

    Ok(pool)
}
