// Dynamic route-resolution pipeline: classifier -> gate -> resolver ->
// handler invocation. Mounted as the router fallback so every
// `<resource>[/<action>][?action=<name>]` shape lands here.

pub mod capabilities;
pub mod classifier;
pub mod gate;
pub mod registry;
pub mod resolver;

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::response::{IntoResponse, Json, Response};
use serde_json::Value;

use crate::config;
use crate::error::ApiError;

pub use capabilities::{Capabilities, CapabilityError};
pub use classifier::ClassifiedRequest;
pub use gate::{AccessGate, Tier};
pub use registry::{HandlerRegistry, RegistryError, ResourceHandler};

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<HandlerRegistry>,
    pub gate: Arc<AccessGate>,
}

/// Per-request input handed to the resolved action: query parameters merged
/// with a leniently parsed JSON object body (query wins on collision).
#[derive(Debug, Default)]
pub struct RequestContext {
    pub params: HashMap<String, String>,
    pub body: Option<Value>,
    pub tier: Tier,
}

impl RequestContext {
    pub fn new(params: HashMap<String, String>, body: Option<Value>, tier: Tier) -> Self {
        Self { params, body, tier }
    }

    fn from_parts(query: Option<&str>, body_bytes: &[u8], tier: Tier) -> Self {
        let body: Option<Value> = if body_bytes.is_empty() {
            None
        } else {
            serde_json::from_slice(body_bytes).ok()
        };

        let mut params = HashMap::new();
        if let Some(Value::Object(map)) = &body {
            for (key, value) in map {
                match value {
                    Value::String(s) => params.insert(key.clone(), s.clone()),
                    Value::Number(n) => params.insert(key.clone(), n.to_string()),
                    Value::Bool(b) => params.insert(key.clone(), b.to_string()),
                    _ => None,
                };
            }
        }
        if let Some(query) = query {
            for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
                params.insert(name.into_owned(), value.into_owned());
            }
        }

        Self { params, body, tier }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Fetch a required parameter, failing with 400 when absent or blank.
    pub fn require(&self, name: &str) -> Result<&str, ApiError> {
        match self.param(name) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(ApiError::bad_request(format!("'{}' is required", name))),
        }
    }

    pub fn require_i64(&self, name: &str) -> Result<i64, ApiError> {
        self.require(name)?
            .parse()
            .map_err(|_| ApiError::bad_request(format!("'{}' must be an integer", name)))
    }
}

/// Router fallback entry point for the whole dispatch pipeline.
pub async fn dispatch(State(state): State<AppState>, request: Request) -> Response {
    match dispatch_inner(state, request).await {
        Ok(value) => Json(value).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn dispatch_inner(state: AppState, request: Request) -> Result<Value, ApiError> {
    let cfg = &config::config().api;
    let (parts, body) = request.into_parts();

    let classified = classifier::classify(
        &parts.method,
        parts.uri.path(),
        parts.uri.query(),
        &parts.headers,
        cfg,
    );

    // Gate first: no resource code executes for unauthenticated calls
    let tier = state.gate.authorize(classified.auth_token.as_deref()).await?;

    let resource = classified
        .resource
        .clone()
        .ok_or_else(|| ApiError::not_found("Endpoint not found"))?;
    let handler = state
        .registry
        .get(&resource)
        .ok_or_else(|| ApiError::not_found(format!("Endpoint '{}' not found", resource)))?;

    let action = resolver::resolve(&classified, handler.capabilities(), tier)?;

    let bytes = axum::body::to_bytes(body, cfg.max_body_bytes)
        .await
        .map_err(|_| ApiError::bad_request("Failed to read request body"))?;
    let ctx = RequestContext::from_parts(parts.uri.query(), &bytes, tier);

    tracing::debug!(resource = %resource, action = %action, verb = %classified.verb, "dispatching");

    // Handler failures propagate unmodified; their contract is their own
    handler.handle(&action, ctx).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn context_merges_query_over_body() {
        let body = serde_json::to_vec(&json!({"id": 7, "name": "Ada", "active": true})).unwrap();
        let ctx = RequestContext::from_parts(Some("name=Grace&extra=x"), &body, Tier::Standard);

        assert_eq!(ctx.param("id"), Some("7"));
        assert_eq!(ctx.param("active"), Some("true"));
        // query parameter wins over the body field
        assert_eq!(ctx.param("name"), Some("Grace"));
        assert_eq!(ctx.param("extra"), Some("x"));
        assert_eq!(ctx.require_i64("id").unwrap(), 7);
    }

    #[test]
    fn context_tolerates_non_json_body() {
        let ctx = RequestContext::from_parts(Some("id=5"), b"not-json", Tier::Standard);
        assert!(ctx.body.is_none());
        assert_eq!(ctx.param("id"), Some("5"));
    }

    #[test]
    fn require_rejects_missing_and_blank() {
        let ctx = RequestContext::from_parts(Some("name=%20"), &[], Tier::Standard);
        assert_eq!(ctx.require("id").unwrap_err().status_code(), 400);
        assert_eq!(ctx.require("name").unwrap_err().status_code(), 400);
        assert_eq!(
            ctx.require_i64("name").unwrap_err().status_code(),
            400
        );
    }
}
