//! Unified error handling for the server.

use aerokv_engine::Status;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Engine error: {0}")]
    Engine(#[from] aerokv_engine::Error),

    #[error("Invalid request: {0}")]
    BadRequest(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Error response body.
#[derive(Serialize)]
struct ErrorResponse {
    /// Engine status code
    status: i32,
    error: String,
    details: &'static str,
}

/// HTTP status for an engine status code.
fn http_status(status: Status) -> StatusCode {
    match status {
        Status::Ok => StatusCode::OK,
        Status::ErrClient | Status::ErrParam => StatusCode::BAD_REQUEST,
        Status::ErrRecordNotFound | Status::ErrBinNotFound | Status::ErrNamespaceNotFound => {
            StatusCode::NOT_FOUND
        }
        Status::ErrRecordExists
        | Status::ErrRecordGeneration
        | Status::ErrFailElementExists
        | Status::ErrFailElementNotFound => StatusCode::CONFLICT,
        Status::ErrBinIncompatibleType
        | Status::ErrOpNotApplicable
        | Status::ErrGeoInvalidGeoJson => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Engine(e) => {
                tracing::warn!("Engine error: {:?}", e);
                (e.status(), e.to_string())
            }
            AppError::BadRequest(msg) => (Status::ErrClient, msg.clone()),
        };

        let body = Json(ErrorResponse {
            status: status.code(),
            error: message,
            details: status.name(),
        });

        (http_status(status), body).into_response()
    }
}

/// Result type alias for handlers.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicts_map_to_409() {
        assert_eq!(http_status(Status::ErrRecordGeneration), StatusCode::CONFLICT);
        assert_eq!(http_status(Status::ErrRecordExists), StatusCode::CONFLICT);
    }

    #[test]
    fn type_errors_map_to_422() {
        assert_eq!(
            http_status(Status::ErrBinIncompatibleType),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
