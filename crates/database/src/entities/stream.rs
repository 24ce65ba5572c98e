//! Stream record entity definitions

use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

/// A persisted stream record.
///
/// Live-session state (who is connected, the viewer set) is owned by the
/// relay; this record is the durable view of a stream used by the REST API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamRecord {
    pub id: i64,
    pub stream_id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: StreamCategory,
    pub streamer_name: String,
    pub stream_key: String,
    /// Connection id of the broadcaster currently (or last) publishing.
    pub broadcaster_conn: Option<String>,
    pub is_live: bool,
    pub viewer_count: i64,
    pub created_at: String,
    pub actual_start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStreamRequest {
    pub title: String,
    pub description: Option<String>,
    /// Free-form client category, normalized via [`StreamCategory::normalize`].
    pub category: Option<String>,
    pub streamer_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamCategory {
    Gaming,
    Music,
    TalkShows,
    Education,
    Art,
    Technology,
    Sports,
    Other,
}

impl StreamCategory {
    /// Map a free-form client category string onto the known set.
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "gaming" => StreamCategory::Gaming,
            "music" => StreamCategory::Music,
            "talk" | "talk shows" => StreamCategory::TalkShows,
            "education" => StreamCategory::Education,
            "art" => StreamCategory::Art,
            "technology" => StreamCategory::Technology,
            "sports" => StreamCategory::Sports,
            _ => StreamCategory::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StreamCategory::Gaming => "Gaming",
            StreamCategory::Music => "Music",
            StreamCategory::TalkShows => "Talk Shows",
            StreamCategory::Education => "Education",
            StreamCategory::Art => "Art",
            StreamCategory::Technology => "Technology",
            StreamCategory::Sports => "Sports",
            StreamCategory::Other => "Other",
        }
    }
}

impl From<&str> for StreamCategory {
    fn from(s: &str) -> Self {
        match s {
            "Gaming" => StreamCategory::Gaming,
            "Music" => StreamCategory::Music,
            "Talk Shows" => StreamCategory::TalkShows,
            "Education" => StreamCategory::Education,
            "Art" => StreamCategory::Art,
            "Technology" => StreamCategory::Technology,
            "Sports" => StreamCategory::Sports,
            _ => StreamCategory::Other,
        }
    }
}

/// Generate an opaque public stream id.
pub fn generate_stream_id() -> String {
    format!("stream_{}", cuid2::create_id())
}

/// Generate a stream key handed to the broadcaster at creation time.
pub fn generate_stream_key() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect();
    format!("sk_{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_normalization_maps_known_values() {
        assert_eq!(StreamCategory::normalize("gaming"), StreamCategory::Gaming);
        assert_eq!(StreamCategory::normalize("Talk"), StreamCategory::TalkShows);
        assert_eq!(
            StreamCategory::normalize("technology"),
            StreamCategory::Technology
        );
        assert_eq!(StreamCategory::normalize("general"), StreamCategory::Other);
        assert_eq!(StreamCategory::normalize(""), StreamCategory::Other);
    }

    #[test]
    fn category_round_trips_through_storage_form() {
        for category in [
            StreamCategory::Gaming,
            StreamCategory::TalkShows,
            StreamCategory::Other,
        ] {
            assert_eq!(StreamCategory::from(category.as_str()), category);
        }
    }

    #[test]
    fn generated_ids_carry_their_prefixes() {
        assert!(generate_stream_id().starts_with("stream_"));
        let key = generate_stream_key();
        assert!(key.starts_with("sk_"));
        assert_eq!(key.len(), "sk_".len() + 16);
    }
}
