// Collaborator seams: the dispatch core never talks SQL directly.
//
// Resource handlers consume the relational table through the `RowStore`
// capability, and the access gate consumes persisted API keys through
// `KeySource`. Both have Postgres implementations plus lightweight
// substitutes (env-backed keys, scripted in-memory store for tests).

pub mod postgres;

#[cfg(test)]
pub mod mem;

use std::collections::HashSet;
use std::env;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Abstract access to the relational table backing resource handlers.
///
/// SELECT statements are written so each row comes back as a single JSON
/// column named `row` (`SELECT row_to_json(t) AS row FROM (...) t`), which
/// keeps the trait free of any column typing.
#[async_trait]
pub trait RowStore: Send + Sync {
    async fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Value>, StoreError>;
    async fn fetch_optional(&self, sql: &str, params: &[Value])
        -> Result<Option<Value>, StoreError>;
    /// Execute an INSERT/UPDATE/DELETE, returning the affected row count.
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, StoreError>;
}

/// The currently valid API keys, with the privileged subset called out.
///
/// Admin keys are valid keys too; `admin` is always a subset of `keys`.
#[derive(Debug, Clone, Default)]
pub struct KeySet {
    pub keys: HashSet<String>,
    pub admin: HashSet<String>,
}

impl KeySet {
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn is_admin(&self, key: &str) -> bool {
        self.admin.contains(key)
    }
}

/// Source of the valid-key set. The access gate is the only consumer.
#[async_trait]
pub trait KeySource: Send + Sync {
    async fn load(&self) -> Result<KeySet, StoreError>;
}

/// Key source backed by the `API_KEYS` / `API_ADMIN_KEYS` environment
/// variables (comma separated). Used for database-less deployments and
/// integration tests.
pub struct EnvKeySource;

#[async_trait]
impl KeySource for EnvKeySource {
    async fn load(&self) -> Result<KeySet, StoreError> {
        let mut set = KeySet::default();
        if let Ok(raw) = env::var("API_KEYS") {
            set.keys
                .extend(raw.split(',').map(str::trim).filter(|k| !k.is_empty()).map(String::from));
        }
        if let Ok(raw) = env::var("API_ADMIN_KEYS") {
            for key in raw.split(',').map(str::trim).filter(|k| !k.is_empty()) {
                set.keys.insert(key.to_string());
                set.admin.insert(key.to_string());
            }
        }
        Ok(set)
    }
}
