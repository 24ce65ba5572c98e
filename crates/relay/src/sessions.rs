//! Session registry: source of truth for which sessions are live.
//!
//! A session is one broadcaster's live stream instance: its broadcaster
//! connection id is fixed at creation, its viewer set changes freely while
//! live. A broadcaster index makes disconnect reconciliation O(1) in the
//! number of sessions a connection broadcasts.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::connections::ConnectionId;

/// Live state of one stream session.
#[derive(Debug, Clone)]
pub struct StreamSession {
    pub session_id: String,
    /// Fixed for the whole session lifetime.
    pub broadcaster: ConnectionId,
    pub started_at: DateTime<Utc>,
    viewers: HashSet<ConnectionId>,
}

impl StreamSession {
    fn new(session_id: &str, broadcaster: ConnectionId, started_at: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.to_string(),
            broadcaster,
            started_at,
            viewers: HashSet::new(),
        }
    }

    /// Current viewer count, always derived from the live set.
    pub fn viewer_count(&self) -> usize {
        self.viewers.len()
    }

    pub fn has_viewer(&self, id: &ConnectionId) -> bool {
        self.viewers.contains(id)
    }

    pub fn viewers(&self) -> impl Iterator<Item = &ConnectionId> {
        self.viewers.iter()
    }

    /// Broadcaster plus all viewers, the fan-out audience for this session.
    pub fn members(&self) -> Vec<ConnectionId> {
        let mut members = Vec::with_capacity(self.viewers.len() + 1);
        members.push(self.broadcaster.clone());
        members.extend(self.viewers.iter().cloned());
        members
    }
}

/// Result of an explicit end-session request
#[derive(Debug)]
pub enum EndSessionOutcome {
    /// The session was removed; the final state is returned for cleanup.
    Ended(StreamSession),
    /// The requesting connection is not the broadcaster of record.
    NotBroadcaster,
    NotFound,
}

#[derive(Default)]
struct SessionsInner {
    sessions: HashMap<String, StreamSession>,
    by_broadcaster: HashMap<ConnectionId, HashSet<String>>,
}

impl SessionsInner {
    fn drop_broadcaster_index(&mut self, broadcaster: &ConnectionId, session_id: &str) {
        if let Some(ids) = self.by_broadcaster.get_mut(broadcaster) {
            ids.remove(session_id);
            if ids.is_empty() {
                self.by_broadcaster.remove(broadcaster);
            }
        }
    }
}

/// Registry of all live sessions.
#[derive(Default)]
pub struct SessionRegistry {
    inner: RwLock<SessionsInner>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session, replacing any live entry with the same id.
    ///
    /// A create for an already-live id is expected after a dropped
    /// broadcaster reconnect: the new connection becomes the broadcaster of
    /// record and the replaced entry is returned so the caller can notify
    /// its orphaned viewers.
    pub async fn create_session(
        &self,
        session_id: &str,
        broadcaster: ConnectionId,
        started_at: DateTime<Utc>,
    ) -> Option<StreamSession> {
        let mut inner = self.inner.write().await;

        let replaced = inner.sessions.remove(session_id);
        if let Some(old) = &replaced {
            let old_broadcaster = old.broadcaster.clone();
            inner.drop_broadcaster_index(&old_broadcaster, session_id);
        }

        inner.sessions.insert(
            session_id.to_string(),
            StreamSession::new(session_id, broadcaster.clone(), started_at),
        );
        inner
            .by_broadcaster
            .entry(broadcaster)
            .or_default()
            .insert(session_id.to_string());

        replaced
    }

    /// End a session; only the broadcaster of record may do so.
    pub async fn end_session(
        &self,
        session_id: &str,
        requester: &ConnectionId,
    ) -> EndSessionOutcome {
        let mut inner = self.inner.write().await;

        let Some(session) = inner.sessions.remove(session_id) else {
            return EndSessionOutcome::NotFound;
        };
        if &session.broadcaster != requester {
            inner.sessions.insert(session_id.to_string(), session);
            return EndSessionOutcome::NotBroadcaster;
        }

        let broadcaster = session.broadcaster.clone();
        inner.drop_broadcaster_index(&broadcaster, session_id);
        EndSessionOutcome::Ended(session)
    }

    /// Snapshot of a live session.
    pub async fn get_session(&self, session_id: &str) -> Option<StreamSession> {
        let inner = self.inner.read().await;
        inner.sessions.get(session_id).cloned()
    }

    /// Session ids broadcast by a connection.
    pub async fn sessions_for_broadcaster(&self, broadcaster: &ConnectionId) -> Vec<String> {
        let inner = self.inner.read().await;
        inner
            .by_broadcaster
            .get(broadcaster)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Remove and return every session broadcast by a connection.
    ///
    /// Used by disconnect reconciliation; a repeated call finds nothing,
    /// which keeps the reconciliation idempotent.
    pub async fn remove_sessions_for_broadcaster(
        &self,
        broadcaster: &ConnectionId,
    ) -> Vec<StreamSession> {
        let mut inner = self.inner.write().await;
        let ids: Vec<String> = inner
            .by_broadcaster
            .remove(broadcaster)
            .map(|ids| ids.into_iter().collect())
            .unwrap_or_default();

        ids.iter()
            .filter_map(|id| inner.sessions.remove(id))
            .collect()
    }

    /// Add a viewer to a session's viewer set.
    ///
    /// Returns `(viewer_count, newly_added)`; `None` when the session is not
    /// live. Re-adding a present viewer is a no-op with the unchanged count.
    pub async fn add_viewer(
        &self,
        session_id: &str,
        viewer: ConnectionId,
    ) -> Option<(usize, bool)> {
        let mut inner = self.inner.write().await;
        let session = inner.sessions.get_mut(session_id)?;
        let newly_added = session.viewers.insert(viewer);
        Some((session.viewers.len(), newly_added))
    }

    /// Remove a viewer from a session's viewer set.
    ///
    /// Returns `(viewer_count, was_present)`; `None` when the session is not
    /// live. Removing an absent viewer is a no-op, so both the
    /// signaling-failure path and the disconnect path may call this.
    pub async fn remove_viewer(
        &self,
        session_id: &str,
        viewer: &ConnectionId,
    ) -> Option<(usize, bool)> {
        let mut inner = self.inner.write().await;
        let session = inner.sessions.get_mut(session_id)?;
        let was_present = session.viewers.remove(viewer);
        Some((session.viewers.len(), was_present))
    }

    /// Fan-out audience of a session (broadcaster + viewers).
    pub async fn members(&self, session_id: &str) -> Vec<ConnectionId> {
        let inner = self.inner.read().await;
        inner
            .sessions
            .get(session_id)
            .map(|session| session.members())
            .unwrap_or_default()
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.inner.read().await.sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
