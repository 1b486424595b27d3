// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

/// HTTP API error with appropriate status codes and client-friendly messages.
///
/// Every variant serializes to a JSON body with an `error` field; the
/// dispatch-specific rejections additionally carry `allowed_actions` and
/// `hint` fields so clients can self-correct.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest {
        message: String,
        allowed_actions: Option<Vec<String>>,
        hint: Option<String>,
    },

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden {
        message: String,
        allowed_actions: Option<Vec<String>>,
    },

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest { .. } => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden { .. } => 403,
            ApiError::NotFound(_) => 404,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest { message, .. } => message,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden { message, .. } => message,
            ApiError::NotFound(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::BadRequest {
                message,
                allowed_actions,
                hint,
            } => {
                let mut response = json!({ "error": message });
                if let Some(allowed) = allowed_actions {
                    response["allowed_actions"] = json!(allowed);
                }
                if let Some(hint) = hint {
                    response["hint"] = json!(hint);
                }
                response
            }
            ApiError::Forbidden {
                message,
                allowed_actions,
            } => {
                let mut response = json!({ "error": message });
                if let Some(allowed) = allowed_actions {
                    response["allowed_actions"] = json!(allowed);
                }
                response
            }
            _ => json!({ "error": self.message() }),
        }
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            message: message.into(),
            allowed_actions: None,
            hint: None,
        }
    }

    pub fn bad_request_with_hints(
        message: impl Into<String>,
        allowed_actions: Vec<String>,
        hint: impl Into<String>,
    ) -> Self {
        ApiError::BadRequest {
            message: message.into(),
            allowed_actions: Some(allowed_actions),
            hint: Some(hint.into()),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden {
            message: message.into(),
            allowed_actions: None,
        }
    }

    pub fn forbidden_with_actions(
        message: impl Into<String>,
        allowed_actions: Vec<String>,
    ) -> Self {
        ApiError::Forbidden {
            message: message.into(),
            allowed_actions: Some(allowed_actions),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert collaborator errors to ApiError
impl From<crate::store::StoreError> for ApiError {
    fn from(err: crate::store::StoreError) -> Self {
        match err {
            crate::store::StoreError::Unavailable(msg) => {
                tracing::error!("Store unavailable: {}", msg);
                ApiError::service_unavailable("Data store temporarily unavailable")
            }
            crate::store::StoreError::Query(msg) => {
                // Don't expose internal SQL errors to clients
                tracing::error!("Store query error: {}", msg);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            crate::store::StoreError::Sqlx(sqlx_err) => {
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_always_has_error_field() {
        let cases = vec![
            ApiError::bad_request("nope"),
            ApiError::unauthorized("bad key"),
            ApiError::forbidden("not allowed"),
            ApiError::not_found("missing"),
            ApiError::internal_server_error("boom"),
            ApiError::service_unavailable("down"),
        ];
        for err in cases {
            let body = err.to_json();
            assert!(body.get("error").and_then(Value::as_str).is_some());
        }
    }

    #[test]
    fn forbidden_includes_allowed_actions() {
        let err = ApiError::forbidden_with_actions(
            "Action 'x' is not allowed",
            vec!["list".into(), "get".into()],
        );
        assert_eq!(err.status_code(), 403);
        let body = err.to_json();
        assert_eq!(body["allowed_actions"], json!(["list", "get"]));
    }

    #[test]
    fn bad_request_includes_hints() {
        let err = ApiError::bad_request_with_hints(
            "No action could be resolved",
            vec!["list".into()],
            "use /<resource>/<action> or ?action=<name>",
        );
        assert_eq!(err.status_code(), 400);
        let body = err.to_json();
        assert!(body["hint"].as_str().unwrap().contains("?action="));
        assert_eq!(body["allowed_actions"], json!(["list"]));
    }
}
