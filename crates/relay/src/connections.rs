//! Connection registry: the only component holding transport handles.
//!
//! Maps an opaque connection id to the outbound event channel of one
//! WebSocket connection, plus the role the connection has taken on. Every
//! lookup miss means "connection already gone" and is never an error.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, RwLock};

use crate::events::ServerEvent;

/// Opaque identifier for one transport connection, stable for its lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Mint a fresh unique id.
    pub fn new() -> Self {
        Self(cuid2::create_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Role a connection has taken on within the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionRole {
    Unassigned,
    Broadcaster,
    Viewer,
}

/// Outbound handle for one connection
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

struct ConnectionEntry {
    sender: EventSender,
    role: ConnectionRole,
    session_id: Option<String>,
}

/// Registry of all live connections.
#[derive(Default)]
pub struct ConnectionRegistry {
    inner: RwLock<HashMap<ConnectionId, ConnectionEntry>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Register a newly connected transport; role starts `Unassigned`.
    pub async fn register(&self, sender: EventSender) -> ConnectionId {
        let id = ConnectionId::new();
        let mut inner = self.inner.write().await;
        inner.insert(
            id.clone(),
            ConnectionEntry {
                sender,
                role: ConnectionRole::Unassigned,
                session_id: None,
            },
        );
        id
    }

    /// Remove a connection. Safe to call for ids that are already gone.
    pub async fn unregister(&self, id: &ConnectionId) {
        let mut inner = self.inner.write().await;
        inner.remove(id);
    }

    /// Outbound handle for a connection, if it is still registered.
    pub async fn lookup(&self, id: &ConnectionId) -> Option<EventSender> {
        let inner = self.inner.read().await;
        inner.get(id).map(|entry| entry.sender.clone())
    }

    /// Associate a connection with a session under a role.
    ///
    /// Returns `false` when the connection is already gone.
    pub async fn assign(&self, id: &ConnectionId, role: ConnectionRole, session_id: &str) -> bool {
        let mut inner = self.inner.write().await;
        match inner.get_mut(id) {
            Some(entry) => {
                entry.role = role;
                entry.session_id = Some(session_id.to_string());
                true
            }
            None => false,
        }
    }

    /// Drop a connection's session association, reverting it to `Unassigned`.
    pub async fn clear_assignment(&self, id: &ConnectionId) {
        let mut inner = self.inner.write().await;
        if let Some(entry) = inner.get_mut(id) {
            entry.role = ConnectionRole::Unassigned;
            entry.session_id = None;
        }
    }

    /// Current role and session association of a connection.
    pub async fn assignment(&self, id: &ConnectionId) -> Option<(ConnectionRole, Option<String>)> {
        let inner = self.inner.read().await;
        inner
            .get(id)
            .map(|entry| (entry.role, entry.session_id.clone()))
    }

    /// Deliver an event to one connection.
    ///
    /// Returns `false` when the connection is gone or its channel closed;
    /// callers treat that as "viewer already left", never as an error.
    pub async fn send_to(&self, id: &ConnectionId, event: ServerEvent) -> bool {
        let inner = self.inner.read().await;
        match inner.get(id) {
            Some(entry) => entry.sender.send(event).is_ok(),
            None => false,
        }
    }

    /// Number of live connections.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
