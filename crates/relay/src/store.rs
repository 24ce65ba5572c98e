//! Fire-and-forget bridge to the persistence collaborator.
//!
//! The relay never awaits the store: every durable side effect is pushed
//! through an unbounded command channel consumed by a writer task owned by
//! the runtime. A missing or dead writer degrades to a no-op, which is also
//! how tests run the relay.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::debug;

use crate::connections::ConnectionId;

/// One durable side effect requested by the relay
#[derive(Debug, Clone, PartialEq)]
pub enum PersistCmd {
    /// A broadcaster opened (or re-opened) a session.
    SessionLive {
        session_id: String,
        broadcaster_conn: ConnectionId,
        started_at: DateTime<Utc>,
    },
    /// A session ended, explicitly or through broadcaster disconnect.
    SessionEnded {
        session_id: String,
        ended_at: DateTime<Utc>,
    },
    /// The live viewer count changed.
    ViewerCount {
        session_id: String,
        viewer_count: usize,
    },
    /// A chat message was fanned out.
    ChatAppend {
        session_id: String,
        sender: String,
        body: String,
        sent_at: DateTime<Utc>,
    },
}

/// Cloneable handle the relay uses to request persistence.
#[derive(Clone, Default)]
pub struct StoreSink {
    tx: Option<mpsc::UnboundedSender<PersistCmd>>,
}

impl StoreSink {
    /// Create a sink plus the receiving end for a writer task.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PersistCmd>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that drops every command. Used by tests and by deployments
    /// without a database.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Submit a command. Never blocks, never fails the caller; a closed
    /// channel is logged and ignored.
    pub fn submit(&self, cmd: PersistCmd) {
        let Some(tx) = &self.tx else {
            return;
        };
        if tx.send(cmd).is_err() {
            debug!("persistence writer gone, dropping store command");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn commands_reach_the_writer_side() {
        let (sink, mut rx) = StoreSink::channel();
        sink.submit(PersistCmd::ViewerCount {
            session_id: "s1".to_string(),
            viewer_count: 2,
        });

        let cmd = rx.recv().await.expect("command delivered");
        assert_eq!(
            cmd,
            PersistCmd::ViewerCount {
                session_id: "s1".to_string(),
                viewer_count: 2
            }
        );
    }

    #[tokio::test]
    async fn disabled_and_orphaned_sinks_swallow_commands() {
        let sink = StoreSink::disabled();
        sink.submit(PersistCmd::ViewerCount {
            session_id: "s1".to_string(),
            viewer_count: 2,
        });

        let (sink, rx) = StoreSink::channel();
        drop(rx);
        sink.submit(PersistCmd::ViewerCount {
            session_id: "s1".to_string(),
            viewer_count: 2,
        });
    }
}
