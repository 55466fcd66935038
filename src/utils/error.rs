use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// The six error kinds of the error surface. Each carries a stable type URI,
/// a short title, and (via `IntoResponse`) a per-request correlation id.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid: {0}")]
    Invalid(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("rate limited: {0}")]
    RateLimited { message: String, retry_after_secs: u64 },

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("internal error")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        ApiError::Invalid(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        ApiError::Conflict(msg.into())
    }

    pub fn rate_limited(msg: impl Into<String>, retry_after_secs: u64) -> Self {
        ApiError::RateLimited { message: msg.into(), retry_after_secs }
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        ApiError::Unavailable(msg.into())
    }

    pub fn internal_error(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::error!("internal error: {}", msg);
        ApiError::Internal(msg)
    }

    fn kind(&self) -> (StatusCode, &'static str, &'static str) {
        match self {
            ApiError::NotFound(_) => {
                (StatusCode::NOT_FOUND, "https://errors.slo-server/not-found", "Not Found")
            }
            ApiError::Invalid(_) => {
                (StatusCode::BAD_REQUEST, "https://errors.slo-server/invalid", "Invalid Request")
            }
            ApiError::Conflict(_) => {
                (StatusCode::CONFLICT, "https://errors.slo-server/conflict", "Conflict")
            }
            ApiError::RateLimited { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "https://errors.slo-server/rate-limited",
                "Rate Limited",
            ),
            ApiError::Unavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "https://errors.slo-server/unavailable",
                "Unavailable",
            ),
            ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "https://errors.slo-server/internal",
                "Internal Error",
            ),
        }
    }

    fn detail(&self) -> String {
        match self {
            ApiError::NotFound(m)
            | ApiError::Invalid(m)
            | ApiError::Conflict(m)
            | ApiError::Unavailable(m) => m.clone(),
            ApiError::RateLimited { message, .. } => message.clone(),
            // Internal details are never surfaced to the caller, only logged.
            ApiError::Internal(_) => "an internal error occurred".to_string(),
        }
    }
}

#[derive(Serialize)]
struct ProblemBody {
    #[serde(rename = "type")]
    type_uri: String,
    title: String,
    status: u16,
    detail: String,
    correlation_id: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, type_uri, title) = self.kind();
        let correlation_id = Uuid::new_v4().to_string();

        if matches!(self, ApiError::Internal(_) | ApiError::Conflict(_)) {
            tracing::error!(correlation_id = %correlation_id, "{}", self);
        } else {
            tracing::warn!(correlation_id = %correlation_id, "{}", self);
        }

        let body = ProblemBody {
            type_uri: type_uri.to_string(),
            title: title.to_string(),
            status: status.as_u16(),
            detail: self.detail(),
            correlation_id: correlation_id.clone(),
        };

        let mut response = (status, Json(json!(body))).into_response();
        if let ApiError::RateLimited { retry_after_secs, .. } = self {
            if let Ok(value) = axum::http::HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert("Retry-After", value);
            }
        }
        response.extensions_mut().insert(correlation_id);
        response
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("record not found".to_string()),
            other => {
                tracing::error!("database error: {}", other);
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Internal(format!("serialization error: {}", err))
    }
}
