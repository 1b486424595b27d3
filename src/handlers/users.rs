use std::sync::Arc;

use async_trait::async_trait;
use axum::http::Method;
use serde_json::{json, Value};

use crate::dispatch::{registry, Capabilities, CapabilityError, RequestContext, ResourceHandler};
use crate::error::ApiError;
use crate::store::RowStore;

/// Fields the `verify` action may check for uniqueness. Never interpolate
/// anything outside this list into SQL.
const VERIFIABLE_FIELDS: &[&str] = &["email", "phone"];

const LIST_SQL: &str = "SELECT row_to_json(t) AS row FROM (\
    SELECT id, first_name, last_name, email, phone, address, role, profile, created_at \
    FROM users WHERE status = $1) t";

const GET_SQL: &str = "SELECT row_to_json(t) AS row FROM (\
    SELECT id, first_name, last_name, email, phone, address, role, profile, created_at \
    FROM users WHERE id = $1) t";

const INSERT_SQL: &str = "WITH inserted AS (\
    INSERT INTO users (first_name, last_name, email, phone, address, password, role, status) \
    VALUES ($1, $2, $3, $4, $5, $6, $7, 1) RETURNING id) \
    SELECT row_to_json(t) AS row FROM inserted t";

const UPDATE_SQL: &str = "UPDATE users SET first_name = $1, last_name = $2, email = $3, \
    phone = $4, address = $5, role = $6 WHERE id = $7";

const SET_STATUS_SQL: &str = "UPDATE users SET status = $1 WHERE id = $2";

/// User management over the relational `users` table. Rows are never
/// dropped; delete/activate flip the status flag.
pub struct UsersHandler {
    store: Arc<dyn RowStore>,
    caps: Capabilities,
}

impl UsersHandler {
    pub fn new(store: Arc<dyn RowStore>) -> Result<Self, CapabilityError> {
        let caps = Capabilities::builder()
            .allow("list")
            .allow("get")
            .allow("register")
            .allow("update")
            .allow("delete")
            .allow("activate")
            .allow("verify")
            .verb(Method::GET, "list")
            .verb(Method::POST, "register")
            .verb(Method::PUT, "update")
            .verb(Method::PATCH, "update")
            .verb(Method::DELETE, "delete")
            .default_action("list")
            .protect("update")
            .protect("delete")
            .build()?;
        Ok(Self { store, caps })
    }

    async fn list(&self) -> Result<Value, ApiError> {
        let rows = self.store.fetch_all(LIST_SQL, &[json!(1)]).await?;
        Ok(Value::Array(rows))
    }

    async fn get(&self, ctx: &RequestContext) -> Result<Value, ApiError> {
        let id = ctx.require_i64("id")?;
        self.store
            .fetch_optional(GET_SQL, &[json!(id)])
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))
    }

    async fn register(&self, ctx: &RequestContext) -> Result<Value, ApiError> {
        let first_name = ctx.require("first_name")?;
        let last_name = ctx.require("last_name")?;
        let email = ctx.require("email")?;
        let password = ctx.require("password")?;
        let role = ctx.require("role")?;
        let phone = ctx.param("phone").unwrap_or_default();
        let address = ctx.param("address").unwrap_or_default();

        if self.email_taken(email, None).await? {
            return Err(ApiError::bad_request("Email is already registered"));
        }

        let inserted = self
            .store
            .fetch_optional(
                INSERT_SQL,
                &[
                    json!(first_name),
                    json!(last_name),
                    json!(email),
                    json!(phone),
                    json!(address),
                    json!(password),
                    json!(role),
                ],
            )
            .await?
            .ok_or_else(|| ApiError::internal_server_error("Failed to register user"))?;

        Ok(json!({
            "success": true,
            "message": "User registered",
            "id": inserted["id"],
        }))
    }

    async fn update(&self, ctx: &RequestContext) -> Result<Value, ApiError> {
        let id = ctx.require_i64("id")?;
        let first_name = ctx.require("first_name")?;
        let last_name = ctx.require("last_name")?;
        let email = ctx.require("email")?;
        let role = ctx.require("role")?;
        let phone = ctx.param("phone").unwrap_or_default();
        let address = ctx.param("address").unwrap_or_default();

        if self.email_taken(email, Some(id)).await? {
            return Err(ApiError::bad_request(
                "Email is already registered to another user",
            ));
        }

        let affected = self
            .store
            .execute(
                UPDATE_SQL,
                &[
                    json!(first_name),
                    json!(last_name),
                    json!(email),
                    json!(phone),
                    json!(address),
                    json!(role),
                    json!(id),
                ],
            )
            .await?;
        if affected == 0 {
            return Err(ApiError::not_found("User not found"));
        }

        Ok(json!({ "success": true, "message": "User updated" }))
    }

    async fn set_status(&self, ctx: &RequestContext, status: i64) -> Result<Value, ApiError> {
        let id = ctx.require_i64("id")?;
        let affected = self
            .store
            .execute(SET_STATUS_SQL, &[json!(status), json!(id)])
            .await?;
        if affected == 0 {
            return Err(ApiError::not_found("User not found"));
        }

        let message = if status == 0 {
            "User deactivated"
        } else {
            "User activated"
        };
        Ok(json!({ "success": true, "message": message }))
    }

    async fn verify(&self, ctx: &RequestContext) -> Result<Value, ApiError> {
        let field = ctx.require("field")?;
        let value = ctx.require("value")?;
        let exclude_id = ctx.param("id").and_then(|id| id.parse::<i64>().ok());

        if !VERIFIABLE_FIELDS.contains(&field) {
            return Err(ApiError::bad_request(format!(
                "'field' must be one of: {}",
                VERIFIABLE_FIELDS.join(", ")
            )));
        }

        let exists = self.field_taken(field, value, exclude_id).await?;
        Ok(json!({ "exists": exists }))
    }

    async fn email_taken(&self, email: &str, exclude_id: Option<i64>) -> Result<bool, ApiError> {
        self.field_taken("email", email, exclude_id).await
    }

    async fn field_taken(
        &self,
        field: &str,
        value: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, ApiError> {
        // `field` is allowlisted by callers; the value itself is bound.
        debug_assert!(VERIFIABLE_FIELDS.contains(&field));
        let row = match exclude_id {
            Some(id) => {
                let sql = format!(
                    "SELECT row_to_json(t) AS row FROM (SELECT id FROM users \
                     WHERE {} = $1 AND id != $2 AND status = 1) t",
                    field
                );
                self.store
                    .fetch_optional(&sql, &[json!(value), json!(id)])
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT row_to_json(t) AS row FROM (SELECT id FROM users \
                     WHERE {} = $1 AND status = 1) t",
                    field
                );
                self.store.fetch_optional(&sql, &[json!(value)]).await?
            }
        };
        Ok(row.is_some())
    }
}

#[async_trait]
impl ResourceHandler for UsersHandler {
    fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    fn actions(&self) -> Vec<&'static str> {
        vec![
            "list", "get", "register", "update", "delete", "activate", "verify",
        ]
    }

    async fn handle(&self, action: &str, ctx: RequestContext) -> Result<Value, ApiError> {
        match action {
            "list" => self.list().await,
            "get" => self.get(&ctx).await,
            "register" => self.register(&ctx).await,
            "update" => self.update(&ctx).await,
            "delete" => self.set_status(&ctx, 0).await,
            "activate" => self.set_status(&ctx, 1).await,
            "verify" => self.verify(&ctx).await,
            other => Err(registry::unknown_action(self, other)),
        }
    }
}
