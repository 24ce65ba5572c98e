//! Chat message validation and construction.
//!
//! Messages are fanned out immediately and never retained in memory; the
//! durable copy is handed to the persistence sink best-effort.

use chrono::{DateTime, Utc};

use crate::error::RelayError;

/// Fallback display name for blank or missing senders.
pub const ANONYMOUS_SENDER: &str = "Anonymous";

/// Validation limits for chat submissions
#[derive(Debug, Clone, Copy)]
pub struct ChatLimits {
    pub max_body_length: usize,
    pub max_sender_length: usize,
}

impl Default for ChatLimits {
    fn default() -> Self {
        Self {
            max_body_length: 500,
            max_sender_length: 50,
        }
    }
}

/// One validated chat message, ready for fan-out.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub session_id: String,
    pub sender: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Validate a submission and stamp it with the receipt time.
    ///
    /// A blank sender becomes [`ANONYMOUS_SENDER`]; over-long senders are
    /// truncated rather than rejected. A trimmed-empty body is
    /// [`RelayError::EmptyMessage`], an over-long one
    /// [`RelayError::MessageTooLong`].
    pub fn compose(
        session_id: &str,
        sender: Option<&str>,
        body: &str,
        sent_at: DateTime<Utc>,
        limits: ChatLimits,
    ) -> Result<Self, RelayError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(RelayError::EmptyMessage);
        }
        if body.chars().count() > limits.max_body_length {
            return Err(RelayError::MessageTooLong {
                limit: limits.max_body_length,
            });
        }

        let sender = sender.map(str::trim).filter(|s| !s.is_empty());
        let sender = match sender {
            Some(name) => name.chars().take(limits.max_sender_length).collect(),
            None => ANONYMOUS_SENDER.to_string(),
        };

        Ok(Self {
            session_id: session_id.to_string(),
            sender,
            body: body.to_string(),
            sent_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compose(sender: Option<&str>, body: &str) -> Result<ChatMessage, RelayError> {
        ChatMessage::compose("s1", sender, body, Utc::now(), ChatLimits::default())
    }

    #[test]
    fn blank_sender_becomes_anonymous() {
        assert_eq!(compose(None, "hello").unwrap().sender, "Anonymous");
        assert_eq!(compose(Some(""), "hello").unwrap().sender, "Anonymous");
        assert_eq!(compose(Some("   "), "hello").unwrap().sender, "Anonymous");
        assert_eq!(compose(Some("bob"), "hello").unwrap().sender, "bob");
    }

    #[test]
    fn whitespace_only_body_is_rejected() {
        assert_eq!(compose(Some("bob"), "   "), Err(RelayError::EmptyMessage));
        assert_eq!(compose(Some("bob"), ""), Err(RelayError::EmptyMessage));
    }

    #[test]
    fn body_is_trimmed() {
        assert_eq!(compose(None, "  hi there  ").unwrap().body, "hi there");
    }

    #[test]
    fn over_long_bodies_are_rejected() {
        let body = "x".repeat(501);
        assert_eq!(
            compose(None, &body),
            Err(RelayError::MessageTooLong { limit: 500 })
        );
        let body = "x".repeat(500);
        assert!(compose(None, &body).is_ok());
    }

    #[test]
    fn over_long_senders_are_truncated() {
        let sender = "n".repeat(80);
        let message = compose(Some(&sender), "hello").unwrap();
        assert_eq!(message.sender.chars().count(), 50);
    }
}
