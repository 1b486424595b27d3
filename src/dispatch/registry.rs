use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::error::ApiError;

use super::capabilities::Capabilities;
use super::RequestContext;

/// Contract every resource handler fulfils: a capability descriptor plus the
/// invocable actions themselves.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    fn capabilities(&self) -> &Capabilities;

    /// Names of the actions `handle` actually implements. Checked against
    /// the capability descriptor at registration time.
    fn actions(&self) -> Vec<&'static str>;

    async fn handle(&self, action: &str, ctx: RequestContext) -> Result<Value, ApiError>;
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("resource '{0}' is already registered")]
    Duplicate(String),

    #[error("resource '{resource}' allows action '{action}' but does not implement it")]
    MissingAction { resource: String, action: String },
}

/// Explicit mapping from resource names to handlers.
///
/// Registration validates that every allowed action has a matching
/// implementation, so descriptor/handler mismatches fail at startup instead
/// of surfacing as 500s at request time.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn ResourceHandler>>,
}

impl HandlerRegistry {
    pub fn register(
        &mut self,
        name: &str,
        handler: Arc<dyn ResourceHandler>,
    ) -> Result<(), RegistryError> {
        if self.handlers.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }

        let implemented = handler.actions();
        for action in handler.capabilities().allowed_list() {
            if !implemented.contains(&action.as_str()) {
                return Err(RegistryError::MissingAction {
                    resource: name.to_string(),
                    action,
                });
            }
        }

        self.handlers.insert(name.to_string(), handler);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ResourceHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn resources(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }
}

/// 404 for a resolved action the handler turns out not to implement,
/// listing the invocable actions as a hint. Registration validation makes
/// this unreachable for well-formed handlers; the arm stays as a backstop.
pub fn unknown_action(handler: &dyn ResourceHandler, action: &str) -> ApiError {
    let available: Vec<&str> = handler
        .actions()
        .into_iter()
        .filter(|a| handler.capabilities().is_allowed(a))
        .collect();
    ApiError::not_found(format!(
        "Action '{}' is not implemented; available actions: {}",
        action,
        available.join(", ")
    ))
}
