//! Data access layer for the streaming backend.
//!
//! Repositories provide the document-store collaborator interface between
//! the relay/REST layers and SQLite: upsert/find for stream records and
//! append/recent for chat history.

pub mod chat_message_repository;
pub mod stream_repository;

pub use chat_message_repository::ChatMessageRepository;
pub use stream_repository::StreamRepository;
