//! Error types for the relay layer
//!
//! Absent sessions, connections, and viewers are soft conditions handled
//! in-line (no-op or a terminal notice to the waiting side); only the
//! conditions below surface to the caller as errors.

use thiserror::Error;

use crate::negotiation::{NegotiationInput, NegotiationState};

/// Relay error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RelayError {
    #[error("only the broadcaster may end session {0}")]
    NotBroadcaster(String),

    #[error("chat message is empty")]
    EmptyMessage,

    #[error("chat message exceeds {limit} characters")]
    MessageTooLong { limit: usize },

    #[error("negotiation in state {state:?} cannot accept {input:?}")]
    InvalidNegotiation {
        state: NegotiationState,
        input: NegotiationInput,
    },
}

/// Result type for relay operations
pub type RelayResult<T> = Result<T, RelayError>;
