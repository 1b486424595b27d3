// Standalone command relay process. Independent of the dispatch API; the
// only coupling is the POST /send-command trigger call.

use std::sync::Arc;

use admin_api_rust::relay::{self, RelayHub};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let hub = Arc::new(RelayHub::new());
    let app = relay::router(hub);

    // Shared hosting usually dictates the port through the environment
    let port = std::env::var("RELAY_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(8081);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    println!("🔌 Relay hub listening on http://{}", bind_addr);
    println!("   trigger:   POST http://{}/send-command", bind_addr);
    println!("   websocket: ws://{}/ws", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
