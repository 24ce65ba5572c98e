//! Chat message repository for database operations.

use crate::entities::ChatMessageRecord;
use crate::types::errors::ChatHistoryError;
use crate::types::ChatHistoryResult;
use sqlx::{Row, SqlitePool};

/// Repository for chat-history database operations
#[derive(Clone)]
pub struct ChatMessageRepository {
    pool: SqlitePool,
}

impl ChatMessageRepository {
    /// Create a new chat message repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append one fanned-out chat message to the history
    pub async fn append(
        &self,
        stream_id: &str,
        username: &str,
        body: &str,
        sent_at: &str,
    ) -> ChatHistoryResult<()> {
        sqlx::query(
            "INSERT INTO chat_messages (public_id, stream_id, username, body, sent_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(cuid2::create_id())
        .bind(stream_id)
        .bind(username)
        .bind(body)
        .bind(sent_at)
        .execute(&self.pool)
        .await
        .map_err(|e| ChatHistoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    /// Most recent messages for a stream, newest first
    pub async fn recent_for_stream(
        &self,
        stream_id: &str,
        limit: i64,
    ) -> ChatHistoryResult<Vec<ChatMessageRecord>> {
        let rows = sqlx::query(
            "SELECT id, public_id, stream_id, username, body, sent_at
             FROM chat_messages WHERE stream_id = ?
             ORDER BY sent_at DESC, id DESC LIMIT ?",
        )
        .bind(stream_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ChatHistoryError::DatabaseError(e.to_string()))?;

        rows.iter()
            .map(|row| {
                Ok(ChatMessageRecord {
                    id: row
                        .try_get("id")
                        .map_err(|e| ChatHistoryError::DatabaseError(e.to_string()))?,
                    public_id: row
                        .try_get("public_id")
                        .map_err(|e| ChatHistoryError::DatabaseError(e.to_string()))?,
                    stream_id: row
                        .try_get("stream_id")
                        .map_err(|e| ChatHistoryError::DatabaseError(e.to_string()))?,
                    username: row
                        .try_get("username")
                        .map_err(|e| ChatHistoryError::DatabaseError(e.to_string()))?,
                    body: row
                        .try_get("body")
                        .map_err(|e| ChatHistoryError::DatabaseError(e.to_string()))?,
                    sent_at: row
                        .try_get("sent_at")
                        .map_err(|e| ChatHistoryError::DatabaseError(e.to_string()))?,
                })
            })
            .collect()
    }
}
