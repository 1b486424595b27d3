// Command relay hub: an independent HTTP/WebSocket process that fans
// triggered commands out to every connected session. It shares no state
// with the dispatch API; the only coupling is the trigger HTTP call.

pub mod hub;
pub mod protocol;
pub mod session;
pub mod trigger;

use std::sync::Arc;

use axum::extract::{State, WebSocketUpgrade};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use hub::{RelayHub, SessionState};
pub use protocol::{ClientMessage, ServerMessage};

pub fn router(hub: Arc<RelayHub>) -> Router {
    Router::new()
        .route("/send-command", post(trigger::send_command))
        .route("/ws", get(ws_upgrade))
        .route("/health", get(health))
        .with_state(hub)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn ws_upgrade(
    State(hub): State<Arc<RelayHub>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| session::run(hub, socket))
}

async fn health(State(hub): State<Arc<RelayHub>>) -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "data": {
            "status": "ok",
            "sessions": hub.session_count().await,
        }
    }))
}
