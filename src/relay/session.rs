use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::hub::RelayHub;
use super::protocol::{ClientMessage, ServerMessage};

/// Drive one relay session from upgrade to teardown.
///
/// The socket is split: a writer task pumps the session's outbound channel
/// into the sink (the hub only ever touches the channel), while this task
/// owns the read loop. Malformed inbound payloads are logged and dropped;
/// they never terminate the session.
pub async fn run(hub: Arc<RelayHub>, socket: WebSocket) {
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ServerMessage>();
    let id = hub.register(out_tx.clone()).await;
    tracing::info!(session = %id, "relay client connected");

    let (mut sink, mut stream) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(message) = out_rx.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to serialize relay message");
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // Open before the welcome goes out, so a client that has seen
    // "connected" is guaranteed to be a broadcast target already.
    hub.set_open(id).await;
    let _ = out_tx.send(ServerMessage::Connected);

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Ping) => {
                    let _ = out_tx.send(ServerMessage::Pong);
                }
                Err(err) => {
                    tracing::debug!(session = %id, error = %err, "ignoring malformed client message");
                }
            },
            Ok(Message::Close(_)) => {
                hub.mark_closing(id).await;
                break;
            }
            Ok(_) => {}
            Err(err) => {
                tracing::debug!(session = %id, error = %err, "websocket read error");
                hub.mark_closing(id).await;
                break;
            }
        }
    }

    hub.unregister(id).await;
    drop(out_tx);
    let _ = writer.await;
    tracing::info!(session = %id, "relay client disconnected");
}
