//! # Streamcast Relay Crate
//!
//! The stream session coordinator and signaling relay: the one component of
//! the backend with real concurrency and state-machine concerns. It tracks
//! which sessions are live, which connections view which session, brokers
//! the WebRTC negotiation handshake between a broadcaster and each viewer,
//! fans out chat, and reconciles all state on disconnect. Media never
//! passes through it; only signaling payloads do, forwarded verbatim.
//!
//! ## Architecture
//!
//! - **Connections**: registry mapping connection ids to transport handles
//! - **Sessions**: registry of live sessions and their viewer sets
//! - **Negotiation**: explicit per-(session, viewer) handshake state machine
//! - **Chat**: validation and fan-out of chat submissions
//! - **Store**: fire-and-forget command channel to the persistence layer
//! - **Relay**: the coordinator driving every transition
//!
//! All registries are constructed, injected state owned by [`StreamRelay`];
//! nothing is process-global. A process restart drops all live session and
//! connection state.

pub mod chat;
pub mod connections;
pub mod error;
pub mod events;
pub mod negotiation;
pub mod relay;
pub mod sessions;
pub mod store;

pub use chat::{ChatLimits, ChatMessage, ANONYMOUS_SENDER};
pub use connections::{ConnectionId, ConnectionRegistry, ConnectionRole, EventSender};
pub use error::{RelayError, RelayResult};
pub use events::{ClientEvent, PeerTransportState, ServerEvent};
pub use negotiation::{NegotiationInput, NegotiationOutcome, NegotiationState, NegotiationTable};
pub use relay::StreamRelay;
pub use sessions::{EndSessionOutcome, SessionRegistry, StreamSession};
pub use store::{PersistCmd, StoreSink};
