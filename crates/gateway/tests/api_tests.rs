//! REST API tests for the gateway, driven through the router in-memory.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use streamcast_gateway::{create_router, GatewayState};
use streamcast_relay::{ChatLimits, StoreSink, StreamRelay};

async fn test_app() -> axum::Router {
    let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
    streamcast_database::run_migrations(&pool).await.unwrap();
    let relay = Arc::new(StreamRelay::new(StoreSink::disabled(), ChatLimits::default()));
    create_router(GatewayState::new(pool, relay))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let app = test_app().await;
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn created_streams_appear_in_the_live_list() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/streams",
            json!({"title": "Morning show", "category": "talk", "streamer_name": "dana"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let created = body_json(response).await;
    assert_eq!(created["title"], "Morning show");
    assert_eq!(created["category"], "Talk Shows");
    assert!(created["stream_key"].as_str().unwrap().starts_with("sk_"));
    let stream_id = created["stream_id"].as_str().unwrap().to_string();

    let response = app.clone().oneshot(get("/api/streams")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = body_json(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["stream_id"], stream_id.as_str());
    // The stream key is never exposed outside creation.
    assert!(listed[0].get("stream_key").is_none());
}

#[tokio::test]
async fn blank_titles_are_rejected() {
    let app = test_app().await;
    let response = app
        .oneshot(post_json("/api/streams", json!({"title": "   "})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_streams_yield_404() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(get("/api/streams/stream_missing"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/streams/stream_missing")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn search_matches_title_substrings() {
    let app = test_app().await;
    app.clone()
        .oneshot(post_json("/api/streams", json!({"title": "Chess Marathon"})))
        .await
        .unwrap();
    app.clone()
        .oneshot(post_json("/api/streams", json!({"title": "Cooking"})))
        .await
        .unwrap();

    let response = app
        .oneshot(get("/api/streams/search?q=chess"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let hits = body_json(response).await;
    assert_eq!(hits.as_array().unwrap().len(), 1);
    assert_eq!(hits[0]["title"], "Chess Marathon");
}

#[tokio::test]
async fn deleting_a_stream_removes_it() {
    let app = test_app().await;
    let response = app
        .clone()
        .oneshot(post_json("/api/streams", json!({"title": "Ephemeral"})))
        .await
        .unwrap();
    let created = body_json(response).await;
    let stream_id = created["stream_id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/streams/{stream_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(get(&format!("/api/streams/{stream_id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn chat_history_is_returned_newest_first() {
    let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
    streamcast_database::run_migrations(&pool).await.unwrap();

    let chat = streamcast_database::ChatMessageRepository::new(pool.clone());
    chat.append("stream_1", "alice", "first", "2026-08-07T10:00:00Z")
        .await
        .unwrap();
    chat.append("stream_1", "bob", "second", "2026-08-07T10:00:05Z")
        .await
        .unwrap();

    let relay = Arc::new(StreamRelay::new(StoreSink::disabled(), ChatLimits::default()));
    let app = create_router(GatewayState::new(pool, relay));

    let response = app
        .oneshot(get("/api/streams/stream_1/chat?limit=10"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let messages = body_json(response).await;
    assert_eq!(messages.as_array().unwrap().len(), 2);
    assert_eq!(messages[0]["body"], "second");
    assert_eq!(messages[1]["body"], "first");
}
