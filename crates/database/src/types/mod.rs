//! Shared types and result types for the database layer

pub mod errors;

pub use errors::{ChatHistoryError, DatabaseError, StreamError};

pub type DatabaseResult<T> = Result<T, DatabaseError>;
pub type StreamResult<T> = Result<T, StreamError>;
pub type ChatHistoryResult<T> = Result<T, ChatHistoryError>;
