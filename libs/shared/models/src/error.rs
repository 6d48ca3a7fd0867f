use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures talking to the upstream food-bank API.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Upstream API is not configured")]
    NotConfigured,

    #[error("Rate limited by upstream API")]
    RateLimited,

    #[error("Request timed out after {timeout_seconds} seconds")]
    Timeout { timeout_seconds: u64 },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response body: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ApiError::RateLimited)
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("External service error: {0}")]
    ExternalService(String),
}

impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::NotConfigured => AppError::Unavailable(err.to_string()),
            ApiError::RateLimited => AppError::Unavailable(err.to_string()),
            other => AppError::ExternalService(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::ExternalService(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        tracing::error!("Error: {}: {}", status, message);

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_maps_to_unavailable() {
        let err: AppError = ApiError::RateLimited.into();
        assert!(matches!(err, AppError::Unavailable(_)));
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_status_error_maps_to_bad_gateway() {
        let err: AppError = ApiError::Status { status: 500, body: "boom".to_string() }.into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
