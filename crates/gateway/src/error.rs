//! Error types for the gateway layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Gateway error types
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::DatabaseError(_) | GatewayError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_response = json!({
            "error": status.as_str(),
            "message": self.to_string(),
        });

        (status, Json(error_response)).into_response()
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

impl From<streamcast_database::StreamError> for GatewayError {
    fn from(error: streamcast_database::StreamError) -> Self {
        match error {
            streamcast_database::StreamError::StreamNotFound => {
                GatewayError::NotFound("Stream not found".to_string())
            }
            streamcast_database::StreamError::InvalidInput(msg) => GatewayError::InvalidRequest(msg),
            streamcast_database::StreamError::DatabaseError(msg) => GatewayError::DatabaseError(msg),
        }
    }
}

impl From<streamcast_database::ChatHistoryError> for GatewayError {
    fn from(error: streamcast_database::ChatHistoryError) -> Self {
        match error {
            streamcast_database::ChatHistoryError::DatabaseError(msg) => {
                GatewayError::DatabaseError(msg)
            }
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(error: serde_json::Error) -> Self {
        GatewayError::InvalidRequest(format!("JSON serialization error: {error}"))
    }
}
