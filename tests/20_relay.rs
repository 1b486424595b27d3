mod common;

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsClient = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

async fn connect(server: &common::TestServer) -> Result<WsClient> {
    let url = format!("ws://127.0.0.1:{}/ws", server.port);
    let (ws, _) = connect_async(url.as_str()).await.context("websocket connect")?;
    Ok(ws)
}

async fn next_json(ws: &mut WsClient) -> Result<Value> {
    let deadline = Duration::from_secs(5);
    loop {
        let frame = tokio::time::timeout(deadline, ws.next())
            .await
            .context("timed out waiting for message")?
            .context("socket closed")??;
        if let Message::Text(text) = frame {
            return Ok(serde_json::from_str(&text)?);
        }
    }
}

async fn trigger(server: &common::TestServer, command: &str) -> Result<(StatusCode, Value)> {
    let res = reqwest::Client::new()
        .post(format!("{}/send-command", server.base_url))
        .json(&json!({ "command": command }))
        .send()
        .await?;
    let status = res.status();
    let body = res.json::<Value>().await?;
    Ok((status, body))
}

#[tokio::test]
async fn connect_receives_welcome() -> Result<()> {
    let server = common::spawn_relay().await?;
    let mut ws = connect(&server).await?;

    let welcome = next_json(&mut ws).await?;
    assert_eq!(welcome["type"], "connected");
    Ok(())
}

#[tokio::test]
async fn broadcast_reaches_all_open_sessions() -> Result<()> {
    let server = common::spawn_relay().await?;

    let mut a = connect(&server).await?;
    let mut b = connect(&server).await?;
    assert_eq!(next_json(&mut a).await?["type"], "connected");
    assert_eq!(next_json(&mut b).await?["type"], "connected");

    let (status, body) = trigger(&server, "reload").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["clients"], 2);

    for ws in [&mut a, &mut b] {
        let msg = next_json(ws).await?;
        assert_eq!(msg["type"], "command");
        assert_eq!(msg["command"], "reload");
        assert!(msg["timestamp"].is_i64());
    }
    Ok(())
}

#[tokio::test]
async fn ping_gets_pong_on_same_session() -> Result<()> {
    let server = common::spawn_relay().await?;

    let mut ws = connect(&server).await?;
    assert_eq!(next_json(&mut ws).await?["type"], "connected");

    ws.send(Message::Text(r#"{"type":"ping"}"#.to_string()))
        .await?;
    assert_eq!(next_json(&mut ws).await?["type"], "pong");
    Ok(())
}

#[tokio::test]
async fn malformed_client_message_does_not_kill_the_session() -> Result<()> {
    let server = common::spawn_relay().await?;

    let mut ws = connect(&server).await?;
    assert_eq!(next_json(&mut ws).await?["type"], "connected");

    ws.send(Message::Text("garbage".to_string())).await?;
    ws.send(Message::Text(r#"{"type":"ping"}"#.to_string()))
        .await?;

    // the garbage is dropped; the session still answers the ping
    assert_eq!(next_json(&mut ws).await?["type"], "pong");
    Ok(())
}

#[tokio::test]
async fn malformed_trigger_body_is_rejected_without_broadcast() -> Result<()> {
    let server = common::spawn_relay().await?;

    let mut ws = connect(&server).await?;
    assert_eq!(next_json(&mut ws).await?["type"], "connected");

    let res = reqwest::Client::new()
        .post(format!("{}/send-command", server.base_url))
        .header("Content-Type", "application/json")
        .body("not-json")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<Value>().await?;
    assert_eq!(body["error"], "Invalid JSON");

    // nothing was broadcast: a ping/pong round trip sees no command first
    ws.send(Message::Text(r#"{"type":"ping"}"#.to_string()))
        .await?;
    assert_eq!(next_json(&mut ws).await?["type"], "pong");
    Ok(())
}

#[tokio::test]
async fn disconnected_session_is_cleaned_up() -> Result<()> {
    let server = common::spawn_relay().await?;

    let mut a = connect(&server).await?;
    let mut b = connect(&server).await?;
    assert_eq!(next_json(&mut a).await?["type"], "connected");
    assert_eq!(next_json(&mut b).await?["type"], "connected");

    a.close(None).await?;

    // cleanup is asynchronous; poll the trigger until only one session counts
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let (status, body) = trigger(&server, "sync").await?;
        assert_eq!(status, StatusCode::OK);
        if body["clients"] == 1 {
            break;
        }
        anyhow::ensure!(
            Instant::now() < deadline,
            "closed session was still counted after 5s: {}",
            body
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    // the surviving session received the broadcasts, no crash occurred
    let msg = next_json(&mut b).await?;
    assert_eq!(msg["type"], "command");
    assert_eq!(msg["command"], "sync");
    Ok(())
}
