use std::sync::Arc;

use anyhow::Result;
use sqlx::SqlitePool;
use streamcast_config::AppConfig;
use streamcast_database::{initialize_database, ChatMessageRepository, StreamRepository};
use streamcast_relay::{ChatLimits, PersistCmd, StoreSink, StreamRelay};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

pub mod telemetry {
    use anyhow::Result;
    use tracing::Level;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_max_level(Level::INFO)
            .with_env_filter(env_filter)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

#[derive(Clone)]
pub struct BackendServices {
    pub db_pool: SqlitePool,
    pub relay: Arc<StreamRelay>,
}

impl BackendServices {
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        let db_pool = initialize_database(&config.database).await?;

        let (store, store_rx) = StoreSink::channel();
        let _writer = spawn_persistence_writer(db_pool.clone(), store_rx);

        let chat_limits = ChatLimits {
            max_body_length: config.relay.max_chat_length,
            max_sender_length: config.relay.max_sender_length,
        };
        let relay = Arc::new(StreamRelay::new(store, chat_limits));

        info!("session relay ready");

        Ok(Self { db_pool, relay })
    }
}

/// Spawn the task that applies the relay's fire-and-forget store commands.
///
/// Failures are logged and swallowed; the relay's in-memory state never
/// depends on this task making progress.
pub fn spawn_persistence_writer(
    pool: SqlitePool,
    mut rx: mpsc::UnboundedReceiver<PersistCmd>,
) -> tokio::task::JoinHandle<()> {
    let streams = StreamRepository::new(pool.clone());
    let chat_history = ChatMessageRepository::new(pool);

    tokio::spawn(async move {
        while let Some(cmd) = rx.recv().await {
            match cmd {
                PersistCmd::SessionLive {
                    session_id,
                    broadcaster_conn,
                    started_at,
                } => {
                    if let Err(err) = streams
                        .mark_live(
                            &session_id,
                            broadcaster_conn.as_str(),
                            &started_at.to_rfc3339(),
                        )
                        .await
                    {
                        error!(session = %session_id, %err, "failed to persist session start");
                    }
                }
                PersistCmd::SessionEnded {
                    session_id,
                    ended_at,
                } => {
                    if let Err(err) = streams
                        .mark_ended(&session_id, &ended_at.to_rfc3339())
                        .await
                    {
                        error!(session = %session_id, %err, "failed to persist session end");
                    }
                }
                PersistCmd::ViewerCount {
                    session_id,
                    viewer_count,
                } => {
                    if let Err(err) = streams
                        .set_viewer_count(&session_id, viewer_count as i64)
                        .await
                    {
                        error!(session = %session_id, %err, "failed to persist viewer count");
                    }
                }
                PersistCmd::ChatAppend {
                    session_id,
                    sender,
                    body,
                    sent_at,
                } => {
                    if let Err(err) = chat_history
                        .append(&session_id, &sender, &body, &sent_at.to_rfc3339())
                        .await
                    {
                        error!(session = %session_id, %err, "failed to persist chat message");
                    }
                }
            }
        }
        debug!("persistence writer stopped");
    })
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
