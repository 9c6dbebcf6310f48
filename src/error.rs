use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Body returned by every structured failure
pub const INTERNAL_SERVER_ERROR: &str = "Internal Server Error";

/// Error response type
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Response type for health check endpoint
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Response type for unhealthy status
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct UnhealthyResponse {
    pub status: String,
    pub error: String,
}

/// Failure escaping a dispatcher invocation.
///
/// Validation failures map to 400; store failures map to a generic 500 whose detail is
/// logged but never returned to the caller.
#[derive(Debug)]
pub enum DispatchError {
    /// Request body is not a JSON object
    InvalidBody(String),
    /// Operation needs a path id and none was given
    MissingId,
    /// Store call failed
    Store(anyhow::Error),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::InvalidBody(msg) => write!(f, "Invalid request body: {}", msg),
            DispatchError::MissingId => write!(f, "Missing path parameter: id"),
            DispatchError::Store(err) => write!(f, "Store error: {:#}", err),
        }
    }
}

impl std::error::Error for DispatchError {}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            DispatchError::Store(err) => {
                tracing::error!("Invocation failed: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    INTERNAL_SERVER_ERROR.to_string(),
                )
            }
            invalid => (StatusCode::BAD_REQUEST, invalid.to_string()),
        };

        let body = Json(ErrorResponse {
            error: error_message,
        });

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for DispatchError {
    fn from(err: anyhow::Error) -> Self {
        DispatchError::Store(err)
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(err: serde_json::Error) -> Self {
        DispatchError::InvalidBody(err.to_string())
    }
}
