//! API error types and HTTP response conversion.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ScribeError;

/// API result type.
pub type ApiResult<T> = Result<T, ApiError>;

/// Error surfaced to HTTP callers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request data or unknown workflow type.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// JSON body carried by error responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: String,
    pub code: String,
}

impl From<ScribeError> for ApiError {
    fn from(err: ScribeError) -> Self {
        match err {
            ScribeError::InvalidInput(_) | ScribeError::UnknownWorkflowType { .. } => {
                Self::BadRequest(err.to_string())
            }
            ScribeError::NotFound(_) => Self::NotFound(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ApiErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
        };
        if status.is_server_error() {
            tracing::error!(error = %body.error, "API error");
        }
        (status, Json(body)).into_response()
    }
}
