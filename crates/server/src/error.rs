use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::CallStatus;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Cannot {action} a call that is {from}")]
    InvalidCallState {
        from: CallStatus,
        action: &'static str,
    },

    #[error("File too large. Max size: {max_mb} MB")]
    TooLarge { max_mb: u64 },

    #[error("Database error")]
    Persistence(#[from] sqlx::Error),

    #[error("Media storage failed: {0}")]
    Media(String),

    #[error("Push delivery failed: {0}")]
    Push(String),
}

impl AppError {
    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InvalidCallState { .. } => StatusCode::CONFLICT,
            AppError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Media(_) | AppError::Push(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Short machine-readable code, used on socket `error` events.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotAuthenticated => "not_authenticated",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::Validation(_) => "validation",
            AppError::Conflict(_) => "conflict",
            AppError::InvalidCallState { .. } => "invalid_call_state",
            AppError::TooLarge { .. } => "too_large",
            AppError::Persistence(_) => "persistence",
            AppError::Media(_) => "media",
            AppError::Push(_) => "push",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Persistence(ref e) = self {
            tracing::error!("Database error: {:?}", e);
        }
        (self.status_code(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
