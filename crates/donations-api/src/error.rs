use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use donations_ledger::LedgerError;
use donations_types::api::ActionResponse;

/// Failure surfaced to a caller as `{"success": false, "message": ...}`.
#[derive(Debug, Error)]
#[error("{status}: {message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Validation(msg) => Self::new(StatusCode::BAD_REQUEST, msg),
            LedgerError::Authorization(msg) => Self::new(StatusCode::FORBIDDEN, msg),
            LedgerError::NotFound => Self::new(StatusCode::NOT_FOUND, "No donations found"),
            LedgerError::Store(e) => {
                error!("Ledger store failure: {}", e);
                Self::internal()
            }
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        error!("spawn_blocking join error: {}", e);
        Self::internal()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ActionResponse::failure(self.message))).into_response()
    }
}
