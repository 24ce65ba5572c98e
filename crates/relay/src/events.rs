//! Wire events exchanged between the relay and its WebSocket clients.
//!
//! Signaling payloads (`sdp`, ICE candidates) are carried as opaque
//! `serde_json::Value`s; the relay forwards them without interpretation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::connections::ConnectionId;

/// Events received from a connected client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Register the sender as broadcaster of a session
    CreateSession { session_id: String },
    /// Join a session as a viewer
    JoinSession { session_id: String },
    /// Broadcaster's SDP offer for one viewer
    Offer {
        session_id: String,
        viewer_conn_id: ConnectionId,
        payload: Value,
    },
    /// Viewer's SDP answer, routed back to the broadcaster
    Answer { session_id: String, payload: Value },
    /// Connectivity candidate from either side.
    ///
    /// `viewer_conn_id` is set when the broadcaster addresses a specific
    /// viewer and absent when a viewer addresses the broadcaster.
    IceCandidate {
        session_id: String,
        #[serde(default)]
        viewer_conn_id: Option<ConnectionId>,
        candidate: Value,
    },
    /// Chat submission
    ChatMessage {
        session_id: String,
        #[serde(default)]
        sender: Option<String>,
        body: String,
    },
    /// Explicit termination by the broadcaster
    EndSession { session_id: String },
    /// Application-reported outcome of a peer connection.
    ///
    /// `viewer_conn_id` is set when the broadcaster reports about one of
    /// its viewers and absent when a viewer reports about itself.
    PeerState {
        session_id: String,
        #[serde(default)]
        viewer_conn_id: Option<ConnectionId>,
        state: PeerTransportState,
    },
}

/// Peer-connection outcome reported by the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerTransportState {
    Connected,
    Failed,
    Disconnected,
}

/// Events pushed to a connected client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// First event on every connection; carries the id other peers use to
    /// address this connection
    Hello { connection_id: ConnectionId },
    /// Acknowledges a `create-session`
    SessionCreated { session_id: String },
    /// Tells the broadcaster a viewer joined and negotiation should start
    NewViewer {
        session_id: String,
        viewer_conn_id: ConnectionId,
    },
    /// Presence update, fanned out to everyone in the session
    ViewerCountChanged {
        session_id: String,
        viewer_count: usize,
    },
    Offer {
        session_id: String,
        viewer_conn_id: ConnectionId,
        payload: Value,
    },
    Answer {
        session_id: String,
        viewer_conn_id: ConnectionId,
        payload: Value,
    },
    IceCandidate {
        session_id: String,
        viewer_conn_id: ConnectionId,
        candidate: Value,
    },
    ChatMessage {
        session_id: String,
        sender: String,
        body: String,
        sent_at: DateTime<Utc>,
    },
    /// Terminal notice: the session is gone (ended, or never existed)
    SessionEnded { session_id: String },
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_events_use_kebab_case_tags() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"join-session","session_id":"s1"}"#).unwrap();
        assert_eq!(
            event,
            ClientEvent::JoinSession {
                session_id: "s1".to_string()
            }
        );

        let event: ClientEvent = serde_json::from_str(
            r#"{"type":"chat-message","session_id":"s1","body":"hello"}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            ClientEvent::ChatMessage {
                session_id: "s1".to_string(),
                sender: None,
                body: "hello".to_string()
            }
        );
    }

    #[test]
    fn candidate_direction_field_is_optional() {
        let event: ClientEvent = serde_json::from_str(
            r#"{"type":"ice-candidate","session_id":"s1","candidate":{"sdpMid":"0"}}"#,
        )
        .unwrap();
        match event {
            ClientEvent::IceCandidate { viewer_conn_id, .. } => assert!(viewer_conn_id.is_none()),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn server_events_serialize_with_kebab_case_tags() {
        let json = serde_json::to_string(&ServerEvent::ViewerCountChanged {
            session_id: "s1".to_string(),
            viewer_count: 3,
        })
        .unwrap();
        assert!(json.contains(r#""type":"viewer-count-changed""#));

        let json = serde_json::to_string(&ServerEvent::SessionEnded {
            session_id: "s1".to_string(),
        })
        .unwrap();
        assert!(json.contains(r#""type":"session-ended""#));
    }

    #[test]
    fn peer_state_parses_lowercase_values() {
        let event: ClientEvent = serde_json::from_str(
            r#"{"type":"peer-state","session_id":"s1","state":"failed"}"#,
        )
        .unwrap();
        match event {
            ClientEvent::PeerState { state, .. } => {
                assert_eq!(state, PeerTransportState::Failed)
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
