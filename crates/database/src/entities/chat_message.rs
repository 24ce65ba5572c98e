//! Chat message entity definitions

use serde::{Deserialize, Serialize};

/// A persisted chat message, appended best-effort from the relay fan-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessageRecord {
    pub id: i64,
    pub public_id: String,
    pub stream_id: String,
    pub username: String,
    pub body: String,
    pub sent_at: String,
}
