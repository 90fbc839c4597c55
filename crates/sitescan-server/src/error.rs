use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use sitescan_core::error::CrawlError;

use crate::dto::ErrorResponse;

/// Errors returned by route handlers, rendered as a JSON `{error, message}` body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Crawl(#[from] CrawlError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Crawl(e) => match e {
                CrawlError::InvalidUrl(_) => (StatusCode::BAD_REQUEST, "invalid_url"),
                CrawlError::JobNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                CrawlError::InvalidTransition { .. } => (StatusCode::CONFLICT, "conflict"),
                CrawlError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            },
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}
