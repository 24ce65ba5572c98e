//! The stream relay coordinator.
//!
//! Owns the connection and session registries plus the negotiation table,
//! and drives every state transition: session creation, viewer membership,
//! signaling forwarding, chat fan-out, and disconnect reconciliation.
//! Registries are only ever mutated through this coordinator; durable side
//! effects leave through the [`StoreSink`] and are never awaited.

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::chat::{ChatLimits, ChatMessage};
use crate::connections::{ConnectionId, ConnectionRegistry, ConnectionRole};
use crate::error::{RelayError, RelayResult};
use crate::events::{ClientEvent, PeerTransportState, ServerEvent};
use crate::negotiation::{NegotiationInput, NegotiationOutcome, NegotiationTable};
use crate::sessions::{EndSessionOutcome, SessionRegistry, StreamSession};
use crate::store::{PersistCmd, StoreSink};

/// Coordinator for live sessions and their signaling traffic.
pub struct StreamRelay {
    connections: ConnectionRegistry,
    sessions: SessionRegistry,
    negotiations: NegotiationTable,
    store: StoreSink,
    chat_limits: ChatLimits,
}

impl StreamRelay {
    pub fn new(store: StoreSink, chat_limits: ChatLimits) -> Self {
        Self {
            connections: ConnectionRegistry::new(),
            sessions: SessionRegistry::new(),
            negotiations: NegotiationTable::new(),
            store,
            chat_limits,
        }
    }

    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn negotiations(&self) -> &NegotiationTable {
        &self.negotiations
    }

    /// Register a new transport connection.
    ///
    /// Returns the connection id plus the receiver end of its outbound
    /// queue; a `hello` event carrying the id is already enqueued.
    pub async fn connect(&self) -> (ConnectionId, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.connections.register(tx).await;
        self.connections
            .send_to(
                &id,
                ServerEvent::Hello {
                    connection_id: id.clone(),
                },
            )
            .await;
        debug!(conn = %id, "connection registered");
        (id, rx)
    }

    /// Dispatch one client event.
    pub async fn handle_event(&self, conn: &ConnectionId, event: ClientEvent) -> RelayResult<()> {
        match event {
            ClientEvent::CreateSession { session_id } => {
                self.create_session(conn, &session_id).await
            }
            ClientEvent::JoinSession { session_id } => self.join_session(conn, &session_id).await,
            ClientEvent::Offer {
                session_id,
                viewer_conn_id,
                payload,
            } => self.relay_offer(conn, &session_id, viewer_conn_id, payload).await,
            ClientEvent::Answer { session_id, payload } => {
                self.relay_answer(conn, &session_id, payload).await
            }
            ClientEvent::IceCandidate {
                session_id,
                viewer_conn_id,
                candidate,
            } => {
                self.relay_candidate(conn, &session_id, viewer_conn_id, candidate)
                    .await
            }
            ClientEvent::ChatMessage {
                session_id,
                sender,
                body,
            } => self.post_chat(conn, &session_id, sender.as_deref(), &body).await,
            ClientEvent::EndSession { session_id } => self.end_session(conn, &session_id).await,
            ClientEvent::PeerState {
                session_id,
                viewer_conn_id,
                state,
            } => {
                self.apply_peer_state(conn, &session_id, viewer_conn_id, state)
                    .await
            }
        }
    }

    /// Reconcile all state after a transport closed, for any reason.
    ///
    /// Idempotent: a duplicate disconnect event finds nothing to clean up.
    pub async fn disconnect(&self, conn: &ConnectionId) {
        // Broadcaster side first: every session this connection broadcasts
        // ends now.
        let ended = self.sessions.remove_sessions_for_broadcaster(conn).await;
        for session in &ended {
            info!(conn = %conn, session = %session.session_id, "broadcaster disconnected, ending session");
            self.cleanup_ended_session(session).await;
            self.store.submit(PersistCmd::SessionEnded {
                session_id: session.session_id.clone(),
                ended_at: Utc::now(),
            });
        }

        // Otherwise the connection may have been viewing a session.
        if ended.is_empty() {
            if let Some((ConnectionRole::Viewer, Some(session_id))) =
                self.connections.assignment(conn).await
            {
                debug!(conn = %conn, session = %session_id, "viewer disconnected");
                self.drop_viewer(&session_id, conn).await;
            }
        }

        // Unregister last so operations racing this disconnect still
        // resolve the connection.
        self.connections.unregister(conn).await;
    }

    async fn create_session(&self, conn: &ConnectionId, session_id: &str) -> RelayResult<()> {
        let now = Utc::now();
        let replaced = self
            .sessions
            .create_session(session_id, conn.clone(), now)
            .await;

        if let Some(old) = replaced {
            // A create over a live id is a broadcaster reconnect: the old
            // entry's viewers are orphaned and told the stream ended; the
            // old broadcaster connection is left to close on its own.
            info!(session = %session_id, old_broadcaster = %old.broadcaster, new_broadcaster = %conn, "replacing live session entry");
            self.negotiations.discard_session(session_id).await;
            for viewer in old.viewers() {
                self.connections
                    .send_to(
                        viewer,
                        ServerEvent::SessionEnded {
                            session_id: session_id.to_string(),
                        },
                    )
                    .await;
                self.connections.clear_assignment(viewer).await;
            }
            if &old.broadcaster != conn {
                self.connections.clear_assignment(&old.broadcaster).await;
            }
        }

        self.connections
            .assign(conn, ConnectionRole::Broadcaster, session_id)
            .await;
        self.connections
            .send_to(
                conn,
                ServerEvent::SessionCreated {
                    session_id: session_id.to_string(),
                },
            )
            .await;
        self.store.submit(PersistCmd::SessionLive {
            session_id: session_id.to_string(),
            broadcaster_conn: conn.clone(),
            started_at: now,
        });

        info!(session = %session_id, broadcaster = %conn, "session live");
        Ok(())
    }

    async fn join_session(&self, conn: &ConnectionId, session_id: &str) -> RelayResult<()> {
        let Some(session) = self.sessions.get_session(session_id).await else {
            debug!(conn = %conn, session = %session_id, "join for dead session");
            self.send_session_ended(conn, session_id).await;
            return Ok(());
        };

        let Some((viewer_count, newly_added)) =
            self.sessions.add_viewer(session_id, conn.clone()).await
        else {
            // Session ended between the lookup and the insert.
            self.send_session_ended(conn, session_id).await;
            return Ok(());
        };

        if !newly_added {
            debug!(conn = %conn, session = %session_id, "viewer already joined");
            return Ok(());
        }

        self.connections
            .assign(conn, ConnectionRole::Viewer, session_id)
            .await;
        self.negotiations.begin(session_id, conn).await;

        if &session.broadcaster != conn {
            self.connections
                .send_to(
                    &session.broadcaster,
                    ServerEvent::NewViewer {
                        session_id: session_id.to_string(),
                        viewer_conn_id: conn.clone(),
                    },
                )
                .await;
        }

        self.broadcast_viewer_count(session_id, viewer_count).await;
        debug!(conn = %conn, session = %session_id, viewer_count, "viewer joined");
        Ok(())
    }

    async fn relay_offer(
        &self,
        conn: &ConnectionId,
        session_id: &str,
        viewer: ConnectionId,
        payload: serde_json::Value,
    ) -> RelayResult<()> {
        let Some(session) = self.sessions.get_session(session_id).await else {
            debug!(conn = %conn, session = %session_id, "dropping offer for dead session");
            return Ok(());
        };
        if !session.has_viewer(&viewer) {
            // The viewer left; its negotiation is no longer valid.
            self.negotiations.discard(session_id, &viewer).await;
            debug!(session = %session_id, viewer = %viewer, "dropping offer for departed viewer");
            return Ok(());
        }

        if !self
            .gate_negotiation(session_id, &viewer, NegotiationInput::Offer)
            .await?
        {
            return Ok(());
        }

        self.connections
            .send_to(
                &viewer,
                ServerEvent::Offer {
                    session_id: session_id.to_string(),
                    viewer_conn_id: viewer.clone(),
                    payload,
                },
            )
            .await;
        Ok(())
    }

    async fn relay_answer(
        &self,
        conn: &ConnectionId,
        session_id: &str,
        payload: serde_json::Value,
    ) -> RelayResult<()> {
        // The viewer is actively waiting: a dead session gets a terminal
        // notice, never silence.
        let Some(session) = self.sessions.get_session(session_id).await else {
            self.send_session_ended(conn, session_id).await;
            return Ok(());
        };
        if !session.has_viewer(conn) {
            self.negotiations.discard(session_id, conn).await;
            debug!(session = %session_id, viewer = %conn, "dropping answer from departed viewer");
            return Ok(());
        }

        if !self
            .gate_negotiation(session_id, conn, NegotiationInput::Answer)
            .await?
        {
            return Ok(());
        }

        self.connections
            .send_to(
                &session.broadcaster,
                ServerEvent::Answer {
                    session_id: session_id.to_string(),
                    viewer_conn_id: conn.clone(),
                    payload,
                },
            )
            .await;
        Ok(())
    }

    async fn relay_candidate(
        &self,
        conn: &ConnectionId,
        session_id: &str,
        viewer_conn_id: Option<ConnectionId>,
        candidate: serde_json::Value,
    ) -> RelayResult<()> {
        match viewer_conn_id {
            // Broadcaster → viewer.
            Some(viewer) => {
                let Some(session) = self.sessions.get_session(session_id).await else {
                    debug!(session = %session_id, "dropping candidate for dead session");
                    return Ok(());
                };
                if !session.has_viewer(&viewer) {
                    self.negotiations.discard(session_id, &viewer).await;
                    debug!(session = %session_id, viewer = %viewer, "dropping candidate for departed viewer");
                    return Ok(());
                }

                if !self
                    .gate_negotiation(session_id, &viewer, NegotiationInput::Candidate)
                    .await?
                {
                    return Ok(());
                }

                self.connections
                    .send_to(
                        &viewer,
                        ServerEvent::IceCandidate {
                            session_id: session_id.to_string(),
                            viewer_conn_id: viewer.clone(),
                            candidate,
                        },
                    )
                    .await;
                Ok(())
            }
            // Viewer → broadcaster.
            None => {
                let Some(session) = self.sessions.get_session(session_id).await else {
                    self.send_session_ended(conn, session_id).await;
                    return Ok(());
                };
                if !session.has_viewer(conn) {
                    self.negotiations.discard(session_id, conn).await;
                    debug!(session = %session_id, viewer = %conn, "dropping candidate from departed viewer");
                    return Ok(());
                }

                if !self
                    .gate_negotiation(session_id, conn, NegotiationInput::Candidate)
                    .await?
                {
                    return Ok(());
                }

                self.connections
                    .send_to(
                        &session.broadcaster,
                        ServerEvent::IceCandidate {
                            session_id: session_id.to_string(),
                            viewer_conn_id: conn.clone(),
                            candidate,
                        },
                    )
                    .await;
                Ok(())
            }
        }
    }

    async fn post_chat(
        &self,
        conn: &ConnectionId,
        session_id: &str,
        sender: Option<&str>,
        body: &str,
    ) -> RelayResult<()> {
        if self.sessions.get_session(session_id).await.is_none() {
            self.send_session_ended(conn, session_id).await;
            return Ok(());
        }

        let message = ChatMessage::compose(session_id, sender, body, Utc::now(), self.chat_limits)?;

        let event = ServerEvent::ChatMessage {
            session_id: message.session_id.clone(),
            sender: message.sender.clone(),
            body: message.body.clone(),
            sent_at: message.sent_at,
        };
        let members = self.sessions.members(session_id).await;
        self.broadcast(&members, event).await;

        self.store.submit(PersistCmd::ChatAppend {
            session_id: message.session_id,
            sender: message.sender,
            body: message.body,
            sent_at: message.sent_at,
        });
        Ok(())
    }

    async fn end_session(&self, conn: &ConnectionId, session_id: &str) -> RelayResult<()> {
        match self.sessions.end_session(session_id, conn).await {
            EndSessionOutcome::Ended(session) => {
                info!(session = %session_id, broadcaster = %conn, "session ended by broadcaster");
                self.cleanup_ended_session(&session).await;
                self.connections.clear_assignment(conn).await;
                self.store.submit(PersistCmd::SessionEnded {
                    session_id: session_id.to_string(),
                    ended_at: Utc::now(),
                });
                Ok(())
            }
            EndSessionOutcome::NotBroadcaster => {
                warn!(session = %session_id, conn = %conn, "end-session from non-broadcaster");
                Err(RelayError::NotBroadcaster(session_id.to_string()))
            }
            EndSessionOutcome::NotFound => {
                debug!(session = %session_id, "end-session for dead session");
                Ok(())
            }
        }
    }

    async fn apply_peer_state(
        &self,
        conn: &ConnectionId,
        session_id: &str,
        viewer_conn_id: Option<ConnectionId>,
        state: PeerTransportState,
    ) -> RelayResult<()> {
        let viewer = viewer_conn_id.unwrap_or_else(|| conn.clone());

        match state {
            PeerTransportState::Connected => {
                if self
                    .gate_negotiation(session_id, &viewer, NegotiationInput::PeerConnected)
                    .await?
                {
                    debug!(session = %session_id, viewer = %viewer, "negotiation established");
                }
                Ok(())
            }
            PeerTransportState::Failed | PeerTransportState::Disconnected => {
                // Failure never ends the session, it only removes the viewer.
                debug!(session = %session_id, viewer = %viewer, ?state, "peer connection failed");
                self.negotiations
                    .apply(session_id, &viewer, NegotiationInput::PeerFailed)
                    .await;
                self.drop_viewer(session_id, &viewer).await;
                Ok(())
            }
        }
    }

    /// Apply a signaling input to a pair's negotiation.
    ///
    /// `Ok(true)` means forward the message, `Ok(false)` means drop it
    /// quietly (no active negotiation), `Err` means the input is illegal in
    /// the pair's current state and must not be forwarded.
    async fn gate_negotiation(
        &self,
        session_id: &str,
        viewer: &ConnectionId,
        input: NegotiationInput,
    ) -> RelayResult<bool> {
        match self.negotiations.apply(session_id, viewer, input).await {
            NegotiationOutcome::Advanced(_) => Ok(true),
            NegotiationOutcome::Unknown => {
                debug!(session = %session_id, viewer = %viewer, ?input, "no active negotiation, dropping");
                Ok(false)
            }
            NegotiationOutcome::Rejected(state) => {
                warn!(session = %session_id, viewer = %viewer, ?state, ?input, "rejecting out-of-order signaling message");
                Err(RelayError::InvalidNegotiation { state, input })
            }
        }
    }

    /// Remove a viewer from a session, discarding its negotiation and
    /// fanning out the updated count. Safe to call redundantly.
    async fn drop_viewer(&self, session_id: &str, viewer: &ConnectionId) {
        self.negotiations.discard(session_id, viewer).await;

        let Some((viewer_count, was_present)) =
            self.sessions.remove_viewer(session_id, viewer).await
        else {
            return;
        };
        if !was_present {
            return;
        }

        self.connections.clear_assignment(viewer).await;
        self.broadcast_viewer_count(session_id, viewer_count).await;
        debug!(session = %session_id, viewer = %viewer, viewer_count, "viewer removed");
    }

    /// Tear down a session that is already out of the registry: tell every
    /// viewer the stream ended and drop the bookkeeping.
    async fn cleanup_ended_session(&self, session: &StreamSession) {
        self.negotiations.discard_session(&session.session_id).await;
        for viewer in session.viewers() {
            self.connections
                .send_to(
                    viewer,
                    ServerEvent::SessionEnded {
                        session_id: session.session_id.clone(),
                    },
                )
                .await;
            self.connections.clear_assignment(viewer).await;
        }
    }

    async fn broadcast_viewer_count(&self, session_id: &str, viewer_count: usize) {
        let members = self.sessions.members(session_id).await;
        self.broadcast(
            &members,
            ServerEvent::ViewerCountChanged {
                session_id: session_id.to_string(),
                viewer_count,
            },
        )
        .await;
        self.store.submit(PersistCmd::ViewerCount {
            session_id: session_id.to_string(),
            viewer_count,
        });
    }

    async fn broadcast(&self, members: &[ConnectionId], event: ServerEvent) {
        for member in members {
            self.connections.send_to(member, event.clone()).await;
        }
    }

    async fn send_session_ended(&self, conn: &ConnectionId, session_id: &str) {
        self.connections
            .send_to(
                conn,
                ServerEvent::SessionEnded {
                    session_id: session_id.to_string(),
                },
            )
            .await;
    }
}
