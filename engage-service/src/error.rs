use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Request-level error taxonomy. Every variant is recovered at the request
/// boundary and surfaced as a structured response; none are fatal.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    PermissionDenied(String),
    #[error("insufficient stock: only {available} available")]
    InsufficientStock { available: i64 },
    #[error("insufficient balance: {required} points required, {available} available")]
    InsufficientBalance { required: i64, available: i64 },
    #[error("{0}")]
    Conflict(String),
    // Froms
    #[error("{0}")]
    Sqlx(#[from] sqlx::Error),
}

impl Error {
    /// Machine-readable kind for the response body.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "not_found",
            Error::InvalidInput(_) => "invalid_input",
            Error::PermissionDenied(_) => "permission_denied",
            Error::InsufficientStock { .. } => "insufficient_stock",
            Error::InsufficientBalance { .. } => "insufficient_balance",
            Error::Conflict(_) => "conflict",
            Error::Sqlx(_) => "internal",
        }
    }
}

impl From<&Error> for StatusCode {
    fn from(error: &Error) -> Self {
        match error {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Error::InsufficientStock { .. }
            | Error::InsufficientBalance { .. }
            | Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Sqlx(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = StatusCode::from(&self);
        // Storage errors are logged, not leaked.
        let message = match &self {
            Error::Sqlx(e) => {
                tracing::error!(error = ?e, "storage error");
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "kind": self.kind(),
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}
