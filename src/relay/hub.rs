use std::collections::HashMap;

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use super::protocol::ServerMessage;

/// Session lifecycle: Connecting -> Open -> Closing -> Closed. Closed is
/// terminal; a removed session's identity is gone and clients reconnect by
/// opening a new session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    Closing,
}

struct SessionHandle {
    tx: mpsc::UnboundedSender<ServerMessage>,
    state: SessionState,
}

/// Owns the set of connected relay sessions. The map is the only shared
/// mutable state in the relay process; every connect/receive/close/broadcast
/// path goes through the lock here.
#[derive(Default)]
pub struct RelayHub {
    sessions: RwLock<HashMap<Uuid, SessionHandle>>,
}

impl RelayHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session in the Connecting state.
    pub async fn register(&self, tx: mpsc::UnboundedSender<ServerMessage>) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions.write().await.insert(
            id,
            SessionHandle {
                tx,
                state: SessionState::Connecting,
            },
        );
        id
    }

    /// Transition a session to Open, making it a broadcast target.
    pub async fn set_open(&self, id: Uuid) {
        if let Some(session) = self.sessions.write().await.get_mut(&id) {
            session.state = SessionState::Open;
        }
    }

    /// Mark a session as going away; broadcasts skip it from now on.
    pub async fn mark_closing(&self, id: Uuid) {
        if let Some(session) = self.sessions.write().await.get_mut(&id) {
            session.state = SessionState::Closing;
        }
    }

    /// Remove a session. Idempotent; removing an already-removed session is
    /// a no-op and reports `false`.
    pub async fn unregister(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Fan a command out to every Open session, returning how many sessions
    /// the delivery was attempted to.
    ///
    /// Senders are snapshotted under the read lock and the sends happen
    /// outside it, through unbounded channels, so a slow client can neither
    /// hold the lock nor stall the other deliveries. A session that closes
    /// mid-broadcast just drops out of the count. Best effort, at most once
    /// per session per trigger.
    pub async fn broadcast(&self, command: &str) -> usize {
        let message = ServerMessage::Command {
            command: command.to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        };

        let targets: Vec<mpsc::UnboundedSender<ServerMessage>> = {
            let sessions = self.sessions.read().await;
            sessions
                .values()
                .filter(|s| s.state == SessionState::Open)
                .map(|s| s.tx.clone())
                .collect()
        };

        let mut delivered = 0;
        for tx in targets {
            if tx.send(message.clone()).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    #[cfg(test)]
    pub(crate) async fn state_of(&self, id: Uuid) -> Option<SessionState> {
        self.sessions.read().await.get(&id).map(|s| s.state)
    }
}
