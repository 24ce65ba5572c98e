//! Stream repository for database operations.

use crate::entities::{
    generate_stream_id, generate_stream_key, CreateStreamRequest, StreamCategory, StreamRecord,
};
use crate::types::errors::StreamError;
use crate::types::StreamResult;
use sqlx::{Row, SqlitePool};

const STREAM_COLUMNS: &str = "id, stream_id, title, description, category, streamer_name, \
     stream_key, broadcaster_conn, is_live, viewer_count, created_at, actual_start_time, end_time";

/// Repository for stream-record database operations
#[derive(Clone)]
pub struct StreamRepository {
    pool: SqlitePool,
}

impl StreamRepository {
    /// Create a new stream repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn record_from_row(row: &sqlx::sqlite::SqliteRow) -> StreamResult<StreamRecord> {
        let category: String = row
            .try_get("category")
            .map_err(|e| StreamError::DatabaseError(e.to_string()))?;

        Ok(StreamRecord {
            id: row
                .try_get("id")
                .map_err(|e| StreamError::DatabaseError(e.to_string()))?,
            stream_id: row
                .try_get("stream_id")
                .map_err(|e| StreamError::DatabaseError(e.to_string()))?,
            title: row
                .try_get("title")
                .map_err(|e| StreamError::DatabaseError(e.to_string()))?,
            description: row
                .try_get("description")
                .map_err(|e| StreamError::DatabaseError(e.to_string()))?,
            category: StreamCategory::from(category.as_str()),
            streamer_name: row
                .try_get("streamer_name")
                .map_err(|e| StreamError::DatabaseError(e.to_string()))?,
            stream_key: row
                .try_get("stream_key")
                .map_err(|e| StreamError::DatabaseError(e.to_string()))?,
            broadcaster_conn: row
                .try_get("broadcaster_conn")
                .map_err(|e| StreamError::DatabaseError(e.to_string()))?,
            is_live: row
                .try_get("is_live")
                .map_err(|e| StreamError::DatabaseError(e.to_string()))?,
            viewer_count: row
                .try_get("viewer_count")
                .map_err(|e| StreamError::DatabaseError(e.to_string()))?,
            created_at: row
                .try_get("created_at")
                .map_err(|e| StreamError::DatabaseError(e.to_string()))?,
            actual_start_time: row
                .try_get("actual_start_time")
                .map_err(|e| StreamError::DatabaseError(e.to_string()))?,
            end_time: row
                .try_get("end_time")
                .map_err(|e| StreamError::DatabaseError(e.to_string()))?,
        })
    }

    /// Create a new stream record, generating its public id and stream key
    pub async fn create(&self, request: &CreateStreamRequest) -> StreamResult<StreamRecord> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(StreamError::InvalidInput("title must not be empty".into()));
        }

        let stream_id = generate_stream_id();
        let stream_key = generate_stream_key();
        let category = StreamCategory::normalize(request.category.as_deref().unwrap_or(""));
        let streamer_name = request
            .streamer_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or("Anonymous");
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO streams (stream_id, title, description, category, streamer_name, \
             stream_key, is_live, viewer_count, created_at)
             VALUES (?, ?, ?, ?, ?, ?, TRUE, 0, ?)",
        )
        .bind(&stream_id)
        .bind(title)
        .bind(&request.description)
        .bind(category.as_str())
        .bind(streamer_name)
        .bind(&stream_key)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| StreamError::DatabaseError(e.to_string()))?;

        self.find_by_stream_id(&stream_id)
            .await?
            .ok_or_else(|| StreamError::DatabaseError("failed to retrieve created stream".into()))
    }

    /// Find a stream by its public stream id
    pub async fn find_by_stream_id(&self, stream_id: &str) -> StreamResult<Option<StreamRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {STREAM_COLUMNS} FROM streams WHERE stream_id = ?"
        ))
        .bind(stream_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StreamError::DatabaseError(e.to_string()))?;

        row.as_ref().map(Self::record_from_row).transpose()
    }

    /// List live streams, newest first
    pub async fn list_live(&self) -> StreamResult<Vec<StreamRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {STREAM_COLUMNS} FROM streams WHERE is_live = TRUE ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StreamError::DatabaseError(e.to_string()))?;

        rows.iter().map(Self::record_from_row).collect()
    }

    /// Case-insensitive substring search over live streams
    pub async fn search_live(&self, query: &str) -> StreamResult<Vec<StreamRecord>> {
        let pattern = format!("%{}%", query.trim().to_lowercase());
        let rows = sqlx::query(&format!(
            "SELECT {STREAM_COLUMNS} FROM streams
             WHERE is_live = TRUE
               AND (LOWER(title) LIKE ? OR LOWER(COALESCE(description, '')) LIKE ? \
                    OR LOWER(category) LIKE ?)
             ORDER BY created_at DESC"
        ))
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StreamError::DatabaseError(e.to_string()))?;

        rows.iter().map(Self::record_from_row).collect()
    }

    /// Delete a stream record; returns whether a row was removed
    pub async fn delete_by_stream_id(&self, stream_id: &str) -> StreamResult<bool> {
        let result = sqlx::query("DELETE FROM streams WHERE stream_id = ?")
            .bind(stream_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StreamError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Mark a stream live, upserting by stream id.
    ///
    /// The relay calls this when a broadcaster opens a session; a record may
    /// or may not already exist (sessions can be created without going
    /// through the REST API first).
    pub async fn mark_live(
        &self,
        stream_id: &str,
        broadcaster_conn: &str,
        started_at: &str,
    ) -> StreamResult<()> {
        sqlx::query(
            "INSERT INTO streams (stream_id, title, category, streamer_name, stream_key, \
             broadcaster_conn, is_live, viewer_count, created_at, actual_start_time)
             VALUES (?, 'Untitled stream', 'Other', 'Anonymous', ?, ?, TRUE, 0, ?, ?)
             ON CONFLICT(stream_id) DO UPDATE SET
               broadcaster_conn = excluded.broadcaster_conn,
               is_live = TRUE,
               end_time = NULL,
               actual_start_time = excluded.actual_start_time",
        )
        .bind(stream_id)
        .bind(generate_stream_key())
        .bind(broadcaster_conn)
        .bind(started_at)
        .bind(started_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StreamError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    /// Mark a stream ended with an end timestamp
    pub async fn mark_ended(&self, stream_id: &str, ended_at: &str) -> StreamResult<()> {
        sqlx::query(
            "UPDATE streams SET is_live = FALSE, end_time = ?, broadcaster_conn = NULL
             WHERE stream_id = ?",
        )
        .bind(ended_at)
        .bind(stream_id)
        .execute(&self.pool)
        .await
        .map_err(|e| StreamError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    /// Record the current live viewer count
    pub async fn set_viewer_count(&self, stream_id: &str, viewer_count: i64) -> StreamResult<()> {
        sqlx::query("UPDATE streams SET viewer_count = ? WHERE stream_id = ?")
            .bind(viewer_count)
            .bind(stream_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StreamError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::run_migrations;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    fn request(title: &str) -> CreateStreamRequest {
        CreateStreamRequest {
            title: title.to_string(),
            description: Some("a test stream".to_string()),
            category: Some("gaming".to_string()),
            streamer_name: Some("alice".to_string()),
        }
    }

    #[tokio::test]
    async fn create_and_fetch_round_trip() {
        let repo = StreamRepository::new(test_pool().await);

        let created = repo.create(&request("Speedrun night")).await.unwrap();
        assert!(created.stream_id.starts_with("stream_"));
        assert!(created.stream_key.starts_with("sk_"));
        assert_eq!(created.category, StreamCategory::Gaming);
        assert!(created.is_live);

        let fetched = repo
            .find_by_stream_id(&created.stream_id)
            .await
            .unwrap()
            .expect("stream should exist");
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn create_rejects_blank_title() {
        let repo = StreamRepository::new(test_pool().await);
        let result = repo.create(&request("   ")).await;
        assert!(matches!(result, Err(StreamError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn list_live_excludes_ended_streams() {
        let repo = StreamRepository::new(test_pool().await);

        let live = repo.create(&request("still here")).await.unwrap();
        let ended = repo.create(&request("gone soon")).await.unwrap();
        repo.mark_ended(&ended.stream_id, &chrono::Utc::now().to_rfc3339())
            .await
            .unwrap();

        let listed = repo.list_live().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].stream_id, live.stream_id);
    }

    #[tokio::test]
    async fn search_matches_title_case_insensitively() {
        let repo = StreamRepository::new(test_pool().await);
        repo.create(&request("Chess Marathon")).await.unwrap();
        repo.create(&request("cooking show")).await.unwrap();

        let hits = repo.search_live("CHESS").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Chess Marathon");
    }

    #[tokio::test]
    async fn mark_live_upserts_missing_records() {
        let repo = StreamRepository::new(test_pool().await);
        let now = chrono::Utc::now().to_rfc3339();

        repo.mark_live("stream_adhoc", "conn-1", &now).await.unwrap();

        let record = repo
            .find_by_stream_id("stream_adhoc")
            .await
            .unwrap()
            .expect("upsert should create the record");
        assert!(record.is_live);
        assert_eq!(record.broadcaster_conn.as_deref(), Some("conn-1"));

        // A second broadcaster reconnect replaces the connection of record.
        repo.mark_live("stream_adhoc", "conn-2", &now).await.unwrap();
        let record = repo.find_by_stream_id("stream_adhoc").await.unwrap().unwrap();
        assert_eq!(record.broadcaster_conn.as_deref(), Some("conn-2"));
    }

    #[tokio::test]
    async fn viewer_count_and_end_updates_apply() {
        let repo = StreamRepository::new(test_pool().await);
        let created = repo.create(&request("counted")).await.unwrap();

        repo.set_viewer_count(&created.stream_id, 7).await.unwrap();
        let record = repo.find_by_stream_id(&created.stream_id).await.unwrap().unwrap();
        assert_eq!(record.viewer_count, 7);

        let ended_at = chrono::Utc::now().to_rfc3339();
        repo.mark_ended(&created.stream_id, &ended_at).await.unwrap();
        let record = repo.find_by_stream_id(&created.stream_id).await.unwrap().unwrap();
        assert!(!record.is_live);
        assert_eq!(record.end_time.as_deref(), Some(ended_at.as_str()));
        assert_eq!(record.broadcaster_conn, None);
    }

    #[tokio::test]
    async fn delete_reports_whether_a_row_existed() {
        let repo = StreamRepository::new(test_pool().await);
        let created = repo.create(&request("short lived")).await.unwrap();

        assert!(repo.delete_by_stream_id(&created.stream_id).await.unwrap());
        assert!(!repo.delete_by_stream_id(&created.stream_id).await.unwrap());
    }
}
