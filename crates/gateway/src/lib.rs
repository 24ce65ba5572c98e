//! # Streamcast Gateway Crate
//!
//! HTTP layer of the streaming backend: the `/ws` WebSocket endpoint that
//! feeds the session relay, plus REST endpoints for stream metadata
//! (create/list/search/delete and chat history).
//!
//! ## Architecture
//!
//! - **REST**: stream metadata endpoints with OpenAPI documentation
//! - **WebSocket**: the signaling/chat transport into the relay
//! - **State**: shared handle to the relay and the repositories
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use streamcast_gateway::{create_router, GatewayState};
//! use streamcast_relay::{ChatLimits, StoreSink, StreamRelay};
//!
//! # async fn run(pool: sqlx::SqlitePool) {
//! let relay = Arc::new(StreamRelay::new(StoreSink::disabled(), ChatLimits::default()));
//! let app = create_router(GatewayState::new(pool, relay));
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:7080").await.unwrap();
//! axum::serve(listener, app).await.unwrap();
//! # }
//! ```

pub mod error;
pub mod rest;
pub mod state;
pub mod websocket;

pub use error::{GatewayError, GatewayResult};
pub use state::GatewayState;

use axum::{http::Method, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create the main application router with all routes
pub fn create_router(state: GatewayState) -> Router {
    let arc_state = Arc::new(state);
    let mut router = Router::new()
        .merge(rest::create_rest_routes().with_state(arc_state.clone()))
        .merge(websocket::create_websocket_routes().with_state(arc_state))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::DELETE])
                .allow_headers(Any),
        );

    // Add Swagger UI if in debug mode
    #[cfg(debug_assertions)]
    {
        #[derive(OpenApi)]
        #[openapi(
            paths(
                rest::health::health_check,
                rest::streams::list_streams,
                rest::streams::create_stream,
                rest::streams::search_streams,
                rest::streams::get_stream,
                rest::streams::delete_stream,
                rest::streams::stream_chat_history,
            ),
            components(
                schemas(
                    rest::health::HealthResponse,
                    rest::streams::StreamResponse,
                    rest::streams::CreatedStreamResponse,
                    rest::streams::CreateStreamRequest,
                    rest::streams::ChatMessageResponse,
                    rest::streams::ErrorResponse,
                )
            ),
            tags(
                (name = "Health", description = "Service health"),
                (name = "Streams", description = "Stream metadata and chat history"),
            )
        )]
        struct ApiDoc;

        router = router
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));
    }

    router
}
