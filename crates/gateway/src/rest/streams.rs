//! Stream metadata REST endpoints

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::error::{GatewayError, GatewayResult};
use crate::state::GatewayState;

const DEFAULT_CHAT_HISTORY_LIMIT: i64 = 50;
const MAX_CHAT_HISTORY_LIMIT: i64 = 200;

#[derive(Debug, Serialize, ToSchema)]
pub struct StreamResponse {
    pub stream_id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub streamer_name: String,
    pub is_live: bool,
    pub viewer_count: i64,
    pub created_at: String,
    pub actual_start_time: Option<String>,
    pub end_time: Option<String>,
}

impl From<streamcast_database::StreamRecord> for StreamResponse {
    fn from(record: streamcast_database::StreamRecord) -> Self {
        Self {
            stream_id: record.stream_id,
            title: record.title,
            description: record.description,
            category: record.category.as_str().to_string(),
            streamer_name: record.streamer_name,
            is_live: record.is_live,
            viewer_count: record.viewer_count,
            created_at: record.created_at,
            actual_start_time: record.actual_start_time,
            end_time: record.end_time,
        }
    }
}

/// Creation response; the stream key is only ever returned here.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedStreamResponse {
    #[serde(flatten)]
    pub stream: StreamResponse,
    pub stream_key: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateStreamRequest {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub streamer_name: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ChatHistoryQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChatMessageResponse {
    pub id: String,
    pub stream_id: String,
    pub username: String,
    pub body: String,
    pub sent_at: String,
}

impl From<streamcast_database::ChatMessageRecord> for ChatMessageResponse {
    fn from(record: streamcast_database::ChatMessageRecord) -> Self {
        Self {
            id: record.public_id,
            stream_id: record.stream_id,
            username: record.username,
            body: record.body,
            sent_at: record.sent_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Create stream routes
pub fn create_stream_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route(
            "/api/streams",
            axum::routing::get(list_streams).post(create_stream),
        )
        .route("/api/streams/search", axum::routing::get(search_streams))
        .route(
            "/api/streams/:stream_id",
            axum::routing::get(get_stream).delete(delete_stream),
        )
        .route(
            "/api/streams/:stream_id/chat",
            axum::routing::get(stream_chat_history),
        )
}

#[utoipa::path(
    get,
    path = "/api/streams",
    tag = "Streams",
    responses(
        (status = 200, description = "Live streams, newest first", body = Vec<StreamResponse>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_streams(
    State(state): State<Arc<GatewayState>>,
) -> GatewayResult<Json<Vec<StreamResponse>>> {
    let streams = state.streams().list_live().await?;
    Ok(Json(streams.into_iter().map(StreamResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/streams",
    tag = "Streams",
    request_body = CreateStreamRequest,
    responses(
        (status = 200, description = "Created stream with its stream key", body = CreatedStreamResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn create_stream(
    State(state): State<Arc<GatewayState>>,
    Json(request): Json<CreateStreamRequest>,
) -> GatewayResult<Json<CreatedStreamResponse>> {
    let record = state
        .streams()
        .create(&streamcast_database::CreateStreamRequest {
            title: request.title,
            description: request.description,
            category: request.category,
            streamer_name: request.streamer_name,
        })
        .await?;

    tracing::info!(stream_id = %record.stream_id, "stream record created");

    let stream_key = record.stream_key.clone();
    Ok(Json(CreatedStreamResponse {
        stream: StreamResponse::from(record),
        stream_key,
    }))
}

#[utoipa::path(
    get,
    path = "/api/streams/search",
    tag = "Streams",
    params(SearchQuery),
    responses(
        (status = 200, description = "Live streams matching the query", body = Vec<StreamResponse>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn search_streams(
    Query(params): Query<SearchQuery>,
    State(state): State<Arc<GatewayState>>,
) -> GatewayResult<Json<Vec<StreamResponse>>> {
    let streams = state.streams().search_live(&params.q).await?;
    Ok(Json(streams.into_iter().map(StreamResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/streams/{stream_id}",
    tag = "Streams",
    params(("stream_id" = String, Path, description = "Public stream id")),
    responses(
        (status = 200, description = "Stream details", body = StreamResponse),
        (status = 404, description = "Stream not found", body = ErrorResponse)
    )
)]
pub async fn get_stream(
    Path(stream_id): Path<String>,
    State(state): State<Arc<GatewayState>>,
) -> GatewayResult<Json<StreamResponse>> {
    let record = state
        .streams()
        .find_by_stream_id(&stream_id)
        .await?
        .ok_or_else(|| GatewayError::NotFound(format!("stream {stream_id}")))?;
    Ok(Json(StreamResponse::from(record)))
}

#[utoipa::path(
    delete,
    path = "/api/streams/{stream_id}",
    tag = "Streams",
    params(("stream_id" = String, Path, description = "Public stream id")),
    responses(
        (status = 204, description = "Stream deleted"),
        (status = 404, description = "Stream not found", body = ErrorResponse)
    )
)]
pub async fn delete_stream(
    Path(stream_id): Path<String>,
    State(state): State<Arc<GatewayState>>,
) -> GatewayResult<impl IntoResponse> {
    let deleted = state.streams().delete_by_stream_id(&stream_id).await?;
    if !deleted {
        return Err(GatewayError::NotFound(format!("stream {stream_id}")));
    }
    Ok(axum::http::StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/streams/{stream_id}/chat",
    tag = "Streams",
    params(
        ("stream_id" = String, Path, description = "Public stream id"),
        ChatHistoryQuery
    ),
    responses(
        (status = 200, description = "Recent chat messages, newest first", body = Vec<ChatMessageResponse>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn stream_chat_history(
    Path(stream_id): Path<String>,
    Query(params): Query<ChatHistoryQuery>,
    State(state): State<Arc<GatewayState>>,
) -> GatewayResult<Json<Vec<ChatMessageResponse>>> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_CHAT_HISTORY_LIMIT)
        .clamp(1, MAX_CHAT_HISTORY_LIMIT);
    let messages = state
        .chat_history()
        .recent_for_stream(&stream_id, limit)
        .await?;
    Ok(Json(
        messages.into_iter().map(ChatMessageResponse::from).collect(),
    ))
}
