use std::sync::Arc;

use tokio::sync::RwLock;

use crate::config::RefreshPolicy;
use crate::error::ApiError;
use crate::store::{KeySet, KeySource};

/// Privilege tier carried by a validated API key. Protected actions require
/// `Admin`; everything else is reachable with `Standard`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tier {
    #[default]
    Standard,
    Admin,
}

/// Validates the auth token against the valid-key set before any resource
/// code runs. Pure check; the only state is the optional process-lifetime
/// key cache.
pub struct AccessGate {
    source: Arc<dyn KeySource>,
    refresh: RefreshPolicy,
    cached: RwLock<Option<Arc<KeySet>>>,
}

impl AccessGate {
    pub fn new(source: Arc<dyn KeySource>, refresh: RefreshPolicy) -> Self {
        Self {
            source,
            refresh,
            cached: RwLock::new(None),
        }
    }

    /// Check the token and return its privilege tier.
    ///
    /// Missing token or a token outside the valid-key set both reject with
    /// 401 before resource lookup.
    pub async fn authorize(&self, token: Option<&str>) -> Result<Tier, ApiError> {
        let keys = self.key_set().await?;

        let token = token.ok_or_else(|| ApiError::unauthorized("Missing API key"))?;
        if keys.is_admin(token) {
            Ok(Tier::Admin)
        } else if keys.contains(token) {
            Ok(Tier::Standard)
        } else {
            Err(ApiError::unauthorized("Invalid API key"))
        }
    }

    async fn key_set(&self) -> Result<Arc<KeySet>, ApiError> {
        if self.refresh == RefreshPolicy::ProcessLifetime {
            if let Some(keys) = self.cached.read().await.clone() {
                return Ok(keys);
            }
        }

        let keys = Arc::new(self.source.load().await.map_err(|e| {
            tracing::error!("failed to load API keys: {}", e);
            ApiError::service_unavailable("Key source unavailable")
        })?);

        if self.refresh == RefreshPolicy::ProcessLifetime {
            *self.cached.write().await = Some(keys.clone());
        }

        Ok(keys)
    }
}
