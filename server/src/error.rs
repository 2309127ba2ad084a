//! Unified error handling for the UI API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::session::SessionError;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(&'static str),
}

/// Error response body.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Session(SessionError::Engine(e)) => match e {
                shelf_engine::Error::EmptyTitle | shelf_engine::Error::EmptyUrl => {
                    StatusCode::BAD_REQUEST
                }
                shelf_engine::Error::BookmarkNotFound(_) => StatusCode::NOT_FOUND,
                shelf_engine::Error::ProvisionalRow(_) => StatusCode::CONFLICT,
                shelf_engine::Error::SessionClosed => StatusCode::SERVICE_UNAVAILABLE,
            },
            AppError::Session(SessionError::Stopped) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (error_message, details) = match &self {
            AppError::Session(SessionError::Engine(e)) => {
                tracing::warn!("Rejected action: {}", e);
                (e.to_string(), None)
            }
            AppError::Session(SessionError::Stopped) => {
                tracing::error!("Session task is gone");
                (
                    "Session unavailable".to_string(),
                    Some(self.to_string()),
                )
            }
            AppError::BadRequest(msg) => (msg.clone(), None),
            AppError::Unauthorized(reason) => ("Unauthorized".to_string(), Some(reason.to_string())),
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
