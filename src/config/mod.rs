use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub api: ApiConfig,
    pub keys: KeyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Leading path segment stripped before classification (e.g. "api").
    /// Empty means resources hang directly off the root.
    pub base_path: String,
    /// Header that must carry a key from the valid-key set.
    pub auth_header: String,
    /// Reserved query parameter that selects an action explicitly.
    pub action_param: String,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyConfig {
    pub refresh: RefreshPolicy,
}

/// How often the valid-key set is reloaded from its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefreshPolicy {
    /// Fetch fresh on every request (keys revoked in the store take effect immediately).
    PerRequest,
    /// Load once and cache for the lifetime of the process.
    ProcessLifetime,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("API_BASE_PATH") {
            self.api.base_path = v.trim_matches('/').to_string();
        }
        if let Ok(v) = env::var("API_AUTH_HEADER") {
            self.api.auth_header = v;
        }
        if let Ok(v) = env::var("API_ACTION_PARAM") {
            self.api.action_param = v;
        }
        if let Ok(v) = env::var("API_MAX_BODY_BYTES") {
            self.api.max_body_bytes = v.parse().unwrap_or(self.api.max_body_bytes);
        }
        if let Ok(v) = env::var("KEYS_REFRESH") {
            self.keys.refresh = match v.as_str() {
                "per-request" => RefreshPolicy::PerRequest,
                "process" | "process-lifetime" => RefreshPolicy::ProcessLifetime,
                _ => self.keys.refresh,
            };
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            api: ApiConfig {
                base_path: String::new(),
                auth_header: "X-API-KEY".to_string(),
                action_param: "action".to_string(),
                max_body_bytes: 10 * 1024 * 1024, // 10MB
            },
            keys: KeyConfig {
                refresh: RefreshPolicy::PerRequest,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            api: ApiConfig {
                base_path: String::new(),
                auth_header: "X-API-KEY".to_string(),
                action_param: "action".to_string(),
                max_body_bytes: 5 * 1024 * 1024, // 5MB
            },
            keys: KeyConfig {
                refresh: RefreshPolicy::ProcessLifetime,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            api: ApiConfig {
                base_path: String::new(),
                auth_header: "X-API-KEY".to_string(),
                action_param: "action".to_string(),
                max_body_bytes: 2 * 1024 * 1024, // 2MB
            },
            keys: KeyConfig {
                refresh: RefreshPolicy::ProcessLifetime,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.api.auth_header, "X-API-KEY");
        assert_eq!(config.api.action_param, "action");
        assert_eq!(config.keys.refresh, RefreshPolicy::PerRequest);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert_eq!(config.keys.refresh, RefreshPolicy::ProcessLifetime);
        assert!(config.api.base_path.is_empty());
    }
}
