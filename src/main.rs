use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use admin_api_rust::config;
use admin_api_rust::dispatch::{self, AccessGate, AppState, HandlerRegistry};
use admin_api_rust::handlers::{SystemHandler, UsersHandler};
use admin_api_rust::store::postgres::{PgKeySource, PgRowStore};
use admin_api_rust::store::{EnvKeySource, KeySource};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, API_KEYS, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = config::config();
    tracing::info!("Starting admin API in {:?} mode", config.environment);

    let state = build_state().await?;
    let app = app(state);

    // Allow tests or deployments to override port via env
    let port = std::env::var("ADMIN_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    println!("🚀 Admin API server listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the registry and access gate. With DATABASE_URL set, users and API
/// keys come from Postgres; otherwise the key set comes from the
/// API_KEYS / API_ADMIN_KEYS environment and only store-less resources are
/// registered.
async fn build_state() -> anyhow::Result<AppState> {
    let mut registry = HandlerRegistry::default();
    registry.register("system", Arc::new(SystemHandler::new()?))?;

    let key_source: Arc<dyn KeySource> = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let store = PgRowStore::connect(&url).await?;
            registry.register("users", Arc::new(UsersHandler::new(Arc::new(store.clone()))?))?;
            Arc::new(PgKeySource::new(store.pool()))
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set; loading API keys from environment");
            Arc::new(EnvKeySource)
        }
    };

    let gate = AccessGate::new(key_source, config::config().keys.refresh);

    Ok(AppState {
        registry: Arc::new(registry),
        gate: Arc::new(gate),
    })
}

fn app(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        // Everything else goes through the dynamic dispatch pipeline
        .fallback(dispatch::dispatch)
        .with_state(state)
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Admin API (Rust)",
            "version": version,
            "description": "Administrative API with dynamic action dispatch",
            "routing": "/<resource>[/<action>][?action=<name>]",
            "auth": "X-API-KEY header (configurable)",
            "resources": {
                "system": "/system[/health|/info]",
                "users": "/users[/list|/get|/register|/update|/delete|/activate|/verify]",
            }
        }
    }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "status": "ok",
            "timestamp": chrono::Utc::now(),
        }
    }))
}
