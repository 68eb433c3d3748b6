use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Cross-cutting error type returned by the HTTP host.
///
/// Mirrors the engine's own two-taxonomy error design (input errors vs.
/// residual violations): `BadRequest` surfaces an input error before the
/// engine ever runs, `Internal` is reserved for a bug (the engine's `run`
/// is documented to never panic or fail outright), and `Collaborator`
/// covers a best-effort persistence or learning-service read that degraded
/// rather than aborted the request.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),

    #[error("Collaborator unavailable: {0}")]
    Collaborator(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Collaborator(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        tracing::error!("{}: {}", status, message);

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
