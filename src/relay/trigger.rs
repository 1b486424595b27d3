use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use super::hub::RelayHub;
use super::protocol::TriggerBody;

/// POST /send-command - broadcast a command to every open session.
///
/// The body is parsed from raw bytes on purpose: a malformed payload must
/// answer exactly `400 {"error":"Invalid JSON"}` with no broadcast, rather
/// than whatever a typed extractor would reject with.
pub async fn send_command(State(hub): State<Arc<RelayHub>>, body: Bytes) -> Response {
    let trigger: TriggerBody = match serde_json::from_slice(&body) {
        Ok(trigger) => trigger,
        Err(err) => {
            tracing::debug!(error = %err, "rejecting malformed trigger body");
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": "Invalid JSON" })))
                .into_response();
        }
    };

    let clients = hub.broadcast(&trigger.command).await;
    tracing::info!(command = %trigger.command, clients, "broadcast command");

    Json(json!({ "success": true, "clients": clients })).into_response()
}
