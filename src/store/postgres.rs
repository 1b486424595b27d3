use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};

use super::{KeySet, KeySource, RowStore, StoreError};

/// Postgres-backed row store. Parameterized queries only; callers never
/// interpolate request data into SQL.
#[derive(Clone)]
pub struct PgRowStore {
    pool: PgPool,
}

impl PgRowStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> PgPool {
        self.pool.clone()
    }
}

fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &'q [Value],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    query.bind(i)
                } else {
                    query.bind(n.as_f64().unwrap_or(0.0))
                }
            }
            Value::String(s) => query.bind(s.as_str()),
            other => query.bind(other.to_string()),
        };
    }
    query
}

fn row_json(row: &sqlx::postgres::PgRow) -> Result<Value, StoreError> {
    row.try_get::<Value, _>("row").map_err(StoreError::from)
}

#[async_trait]
impl RowStore for PgRowStore {
    async fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Value>, StoreError> {
        let rows = bind_params(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_json).collect()
    }

    async fn fetch_optional(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<Option<Value>, StoreError> {
        let row = bind_params(sqlx::query(sql), params)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_json).transpose()
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, StoreError> {
        let result = bind_params(sqlx::query(sql), params)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Key source reading the `api_keys` table. Only rows marked active count;
/// revoking a key in the table takes effect per the configured refresh policy.
pub struct PgKeySource {
    pool: PgPool,
}

impl PgKeySource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    const KEY_QUERY: &'static str =
        "SELECT key, is_admin FROM api_keys WHERE status = 'active'";
}

#[async_trait]
impl KeySource for PgKeySource {
    async fn load(&self) -> Result<KeySet, StoreError> {
        let rows = sqlx::query(Self::KEY_QUERY).fetch_all(&self.pool).await?;

        let mut set = KeySet::default();
        for row in rows {
            let key: String = row.try_get("key")?;
            let is_admin = row.try_get::<Option<bool>, _>("is_admin")?.unwrap_or(false);
            if is_admin {
                set.admin.insert(key.clone());
            }
            set.keys.insert(key);
        }
        Ok(set)
    }
}
