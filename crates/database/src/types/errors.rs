//! Error types for the database layer

use thiserror::Error;

/// General database error
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    #[error("Database query error: {0}")]
    QueryError(String),

    #[error("Database migration error: {0}")]
    MigrationError(String),

    #[error("Entity not found: {0}")]
    NotFound(String),
}

/// Stream-record specific errors
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Stream not found")]
    StreamNotFound,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Chat-history specific errors
#[derive(Debug, Error)]
pub enum ChatHistoryError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}
