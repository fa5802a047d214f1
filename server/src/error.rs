//! Unified error handling for the mirror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Rejected document body, or a stored row the engine cannot read
    #[error("Engine error: {0}")]
    Engine(#[from] lumen_engine::Error),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(&'static str),

    #[error("Corrupt document {remote_ref}: {reason}")]
    CorruptDocument { remote_ref: String, reason: String },

    #[error("Corrupt profile of {user_id}: {reason}")]
    CorruptProfile { user_id: String, reason: String },
}

/// Error response body.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, details) = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                    None,
                )
            }
            AppError::Engine(e) => {
                tracing::warn!("Engine error: {:?}", e);
                let details = match e.field_errors() {
                    [] => None,
                    fields => Some(
                        fields
                            .iter()
                            .map(|f| format!("{}: {}", f.field, f.message))
                            .collect::<Vec<_>>()
                            .join("; "),
                    ),
                };
                let message = if details.is_some() {
                    "Invalid transaction".to_string()
                } else {
                    e.to_string()
                };
                (StatusCode::BAD_REQUEST, message, details)
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
            AppError::CorruptDocument { remote_ref, reason } => {
                tracing::error!(%remote_ref, "Unreadable stored document: {}", reason);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Corrupt stored document".to_string(),
                    None,
                )
            }
            AppError::CorruptProfile { user_id, reason } => {
                tracing::error!(%user_id, "Unreadable stored profile: {}", reason);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Corrupt stored profile".to_string(),
                    None,
                )
            }
            AppError::Unauthorized(reason) => (
                StatusCode::UNAUTHORIZED,
                "Unauthorized".to_string(),
                Some(reason.to_string()),
            ),
        };

        let body = Json(ErrorResponse {
            error: error_message,
            details,
        });

        (status, body).into_response()
    }
}

/// Result type alias for handlers.
pub type Result<T> = std::result::Result<T, AppError>;
