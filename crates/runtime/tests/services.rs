//! Tests for service bootstrap and the persistence writer.

use std::time::Duration;

use streamcast_config::{AppConfig, DatabaseConfig};
use streamcast_database::{StreamRecord, StreamRepository};
use streamcast_relay::ClientEvent;
use streamcast_runtime::BackendServices;
use tempfile::TempDir;
use tokio::time::sleep;

fn test_config(dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.database = DatabaseConfig {
        url: format!("sqlite://{}", dir.path().join("runtime.db").display()),
        max_connections: 2,
    };
    config
}

/// Poll for a stream record until `check` passes or a few seconds elapse;
/// the writer applies store commands asynchronously.
async fn wait_for_record(
    streams: &StreamRepository,
    stream_id: &str,
    check: fn(&StreamRecord) -> bool,
) {
    for _ in 0..100 {
        if let Ok(Some(record)) = streams.find_by_stream_id(stream_id).await {
            if check(&record) {
                return;
            }
        }
        sleep(Duration::from_millis(20)).await;
    }
    panic!("record for {stream_id} did not reach the expected state in time");
}

#[tokio::test]
async fn relay_side_effects_reach_the_database() {
    let dir = TempDir::new().unwrap();
    let services = BackendServices::initialise(&test_config(&dir)).await.unwrap();
    let streams = StreamRepository::new(services.db_pool.clone());

    let (broadcaster, _rx) = services.relay.connect().await;
    services
        .relay
        .handle_event(
            &broadcaster,
            ClientEvent::CreateSession {
                session_id: "stream_live".to_string(),
            },
        )
        .await
        .unwrap();

    wait_for_record(&streams, "stream_live", |record| record.is_live).await;

    services.relay.disconnect(&broadcaster).await;

    wait_for_record(&streams, "stream_live", |record| {
        !record.is_live && record.end_time.is_some()
    })
    .await;
}

#[tokio::test]
async fn initialise_prepares_a_usable_pool() {
    let dir = TempDir::new().unwrap();
    let services = BackendServices::initialise(&test_config(&dir)).await.unwrap();

    sqlx::query("SELECT COUNT(*) FROM streams")
        .fetch_one(&services.db_pool)
        .await
        .unwrap();
}
