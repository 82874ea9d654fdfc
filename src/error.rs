//! Error types for the Roster service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

/// Main error type for Roster operations.
#[derive(Error, Debug)]
pub enum RosterError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Roster store errors
    #[error("Store error: {0}")]
    Store(String),

    /// A requested resource does not exist
    #[error("{0}")]
    NotFound(String),

    /// Request parameters failed validation
    #[error("{0}")]
    InvalidRequest(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RosterError {
    /// HTTP status this error maps to when returned from a handler.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RosterError::NotFound(_) => StatusCode::NOT_FOUND,
            RosterError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RosterError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let body = serde_json::json!({ "detail": self.to_string() });
        (status, Json(body)).into_response()
    }
}

/// Result type alias for Roster operations.
pub type Result<T> = std::result::Result<T, RosterError>;
