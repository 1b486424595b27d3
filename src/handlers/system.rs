use async_trait::async_trait;
use axum::http::Method;
use serde_json::{json, Value};

use crate::dispatch::{registry, Capabilities, CapabilityError, RequestContext, ResourceHandler};
use crate::error::ApiError;

/// Store-less resource: liveness and deployment info. Gives a database-less
/// deployment a complete dispatch path end to end.
pub struct SystemHandler {
    caps: Capabilities,
}

impl SystemHandler {
    pub fn new() -> Result<Self, CapabilityError> {
        let caps = Capabilities::builder()
            .allow("health")
            .allow("info")
            .verb(Method::GET, "health")
            .default_action("health")
            .build()?;
        Ok(Self { caps })
    }
}

#[async_trait]
impl ResourceHandler for SystemHandler {
    fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    fn actions(&self) -> Vec<&'static str> {
        vec!["health", "info"]
    }

    async fn handle(&self, action: &str, _ctx: RequestContext) -> Result<Value, ApiError> {
        match action {
            "health" => Ok(json!({
                "status": "ok",
                "timestamp": chrono::Utc::now(),
            })),
            "info" => Ok(json!({
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
                "routing": "<resource>[/<action>][?action=<name>]",
            })),
            other => Err(registry::unknown_action(self, other)),
        }
    }
}
