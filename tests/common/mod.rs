#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;

pub const TEST_KEY: &str = "test-key";
pub const ADMIN_KEY: &str = "admin-key";

static API_SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn(binary: &str, envs: &[(&str, String)]) -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // Spawn the already-built binary to keep start fast during tests
        // Assumes debug profile; adjust if you run tests with --release
        let mut cmd = Command::new(format!("target/debug/{}", binary));
        cmd.stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        for (key, value) in envs {
            cmd.env(key, value);
        }
        cmd.env("PORT", port.to_string());
        // Keep the spawned server off any ambient database or env profile
        cmd.env_remove("DATABASE_URL").env_remove("APP_ENV");

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self {
            port,
            base_url,
            child,
        })
    }

    pub async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                // Consider server ready on any non-404 response
                if resp.status() == StatusCode::OK
                    || resp.status() == StatusCode::SERVICE_UNAVAILABLE
                {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!(
            "server did not become ready on {} within {:?}",
            self.base_url,
            timeout
        )
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
    }
}

/// Shared dispatch API server, keyed off the environment (no database).
pub async fn ensure_api() -> Result<&'static TestServer> {
    let server = API_SERVER.get_or_init(|| {
        TestServer::spawn(
            "admin-api-rust",
            &[
                ("API_KEYS", TEST_KEY.to_string()),
                ("API_ADMIN_KEYS", ADMIN_KEY.to_string()),
            ],
        )
        .expect("failed to spawn server binary")
    });
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// Fresh relay hub per test, so client counts never race across tests.
pub async fn spawn_relay() -> Result<TestServer> {
    let server = TestServer::spawn("relayd", &[])?;
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}
