use serde::{Deserialize, Serialize};

/// Messages the hub sends to connected clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Welcome, sent right after the session is registered.
    Connected,
    /// Fan-out of a triggered command.
    Command { command: String, timestamp: i64 },
    /// Liveness reply, sent only on the session that pinged.
    Pong,
}

/// Messages clients may send to the hub. Anything that fails to parse as
/// one of these is logged and dropped without terminating the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Ping,
}

/// Body of the out-of-band broadcast trigger call.
#[derive(Debug, Deserialize)]
pub struct TriggerBody {
    pub command: String,
}
