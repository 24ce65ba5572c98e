//! Per-(session, viewer) negotiation state machine.
//!
//! The handshake is broadcaster-initiated: the relay notifies the
//! broadcaster of a new viewer, the broadcaster sends the first offer, the
//! viewer answers, then candidates flow both ways until the application
//! reports the peer connection as established or failed. Making the state
//! explicit lets an out-of-order message (an answer with no offer, a
//! candidate before any offer) be rejected instead of silently forwarded.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::connections::ConnectionId;

/// State of one negotiation between the broadcaster and one viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    /// Viewer joined, broadcaster notified; no offer yet.
    Initiated,
    OfferSent,
    AnswerReceived,
    CandidatesExchanging,
    Established,
    Failed,
}

/// Signaling input applied to a negotiation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationInput {
    Offer,
    Answer,
    Candidate,
    PeerConnected,
    PeerFailed,
}

impl NegotiationState {
    /// Apply one input, yielding the next state or `None` for an illegal
    /// transition.
    pub fn apply(self, input: NegotiationInput) -> Option<NegotiationState> {
        use NegotiationInput::*;
        use NegotiationState::*;

        match (self, input) {
            (Initiated, Offer) | (OfferSent, Offer) => Some(OfferSent),
            (OfferSent, Answer) => Some(AnswerReceived),
            // Candidates are valid any time after the offer went out; the
            // first one following the answer marks both sides exchanging.
            (OfferSent, Candidate) => Some(OfferSent),
            (AnswerReceived, Candidate) => Some(CandidatesExchanging),
            (CandidatesExchanging, Candidate) => Some(CandidatesExchanging),
            (Established, Candidate) => Some(Established),
            (AnswerReceived, PeerConnected)
            | (CandidatesExchanging, PeerConnected)
            | (Established, PeerConnected) => Some(Established),
            (_, PeerFailed) => Some(Failed),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, NegotiationState::Failed)
    }
}

/// Tracks the active negotiation per (session, viewer) pair.
///
/// Entries are discarded when the viewer leaves, the session ends, or
/// either side disconnects; a closed negotiation simply has no entry.
#[derive(Default)]
pub struct NegotiationTable {
    inner: RwLock<HashMap<(String, ConnectionId), NegotiationState>>,
}

/// Outcome of applying a signaling input to a tracked pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationOutcome {
    Advanced(NegotiationState),
    /// No active negotiation for the pair.
    Unknown,
    /// The input is illegal in the current state; the state is unchanged.
    Rejected(NegotiationState),
}

impl NegotiationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) a negotiation for a pair at `Initiated`.
    pub async fn begin(&self, session_id: &str, viewer: &ConnectionId) {
        let mut inner = self.inner.write().await;
        inner.insert(
            (session_id.to_string(), viewer.clone()),
            NegotiationState::Initiated,
        );
    }

    /// Apply an input to a pair's negotiation.
    pub async fn apply(
        &self,
        session_id: &str,
        viewer: &ConnectionId,
        input: NegotiationInput,
    ) -> NegotiationOutcome {
        let mut inner = self.inner.write().await;
        let key = (session_id.to_string(), viewer.clone());
        let Some(state) = inner.get_mut(&key) else {
            return NegotiationOutcome::Unknown;
        };

        match state.apply(input) {
            Some(next) => {
                *state = next;
                NegotiationOutcome::Advanced(next)
            }
            None => NegotiationOutcome::Rejected(*state),
        }
    }

    /// Current state of a pair's negotiation.
    pub async fn state(&self, session_id: &str, viewer: &ConnectionId) -> Option<NegotiationState> {
        let inner = self.inner.read().await;
        inner
            .get(&(session_id.to_string(), viewer.clone()))
            .copied()
    }

    /// Discard the negotiation for one pair.
    pub async fn discard(&self, session_id: &str, viewer: &ConnectionId) {
        let mut inner = self.inner.write().await;
        inner.remove(&(session_id.to_string(), viewer.clone()));
    }

    /// Discard every negotiation belonging to a session.
    pub async fn discard_session(&self, session_id: &str) {
        let mut inner = self.inner.write().await;
        inner.retain(|(sid, _), _| sid != session_id);
    }

    /// Number of active negotiations.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
