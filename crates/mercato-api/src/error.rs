//! API error type and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mercato_commerce::{CommerceError, ErrorKind};
use thiserror::Error;

use crate::response::ApiResponse;

/// Errors returned by handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Identity headers missing or invalid.
    #[error("Authentication required: {0}")]
    Unauthorized(String),

    /// The body or query could not be read.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// The caller's role may not use the endpoint.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error(transparent)]
    Commerce(#[from] CommerceError),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Commerce(e) => match e.kind() {
                ErrorKind::Validation | ErrorKind::InsufficientStock => StatusCode::BAD_REQUEST,
                ErrorKind::Forbidden => StatusCode::FORBIDDEN,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::IllegalTransition | ErrorKind::ConcurrencyExhausted => {
                    StatusCode::CONFLICT
                }
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, errors) = match &self {
            ApiError::Commerce(CommerceError::Validation(detail)) => (
                "Validation failed".to_string(),
                detail.split("; ").map(str::to_string).collect(),
            ),
            ApiError::Commerce(e) if e.kind() == ErrorKind::Internal => {
                tracing::error!(error = %e, "Internal error");
                ("Internal server error".to_string(), Vec::new())
            }
            ApiError::Commerce(e) => (e.to_string(), Vec::new()),
            ApiError::Unauthorized(_) => ("Authentication required".to_string(), vec![self.to_string()]),
            other => (other.to_string(), Vec::new()),
        };
        ApiResponse::failure(status, message, errors).into_response()
    }
}
