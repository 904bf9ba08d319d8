use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::shared::types::ApiResponse;

/// Message returned for every access-token failure, whatever the cause
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid or expired access token";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid transition from '{current}' to '{requested}': {reason}")]
    InvalidTransition {
        current: String,
        requested: String,
        reason: String,
    },

    #[error("{}", INVALID_TOKEN_MESSAGE)]
    InvalidToken,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("External capability failure: {0}")]
    ExternalCapabilityFailure(String),

    #[error("Concurrent modification detected: {0}")]
    ConcurrencyAnomaly(String),
}

impl AppError {
    pub fn invalid_transition(
        current: impl std::fmt::Display,
        requested: impl std::fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        AppError::InvalidTransition {
            current: current.to_string(),
            requested: requested.to_string(),
            reason: reason.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                    None,
                )
            }
            AppError::NotFound(ref msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
            AppError::InvalidTransition { .. } => {
                let msg = self.to_string();
                (StatusCode::CONFLICT, msg.clone(), Some(vec![msg]))
            }
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                INVALID_TOKEN_MESSAGE.to_string(),
                None,
            ),
            AppError::Validation(ref msg) => (
                StatusCode::BAD_REQUEST,
                msg.clone(),
                Some(vec![msg.clone()]),
            ),
            AppError::BadRequest(ref msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
            AppError::Auth(ref msg) => (StatusCode::UNAUTHORIZED, msg.clone(), None),
            AppError::Unauthorized(ref msg) => (StatusCode::UNAUTHORIZED, msg.clone(), None),
            AppError::Forbidden(ref msg) => (StatusCode::FORBIDDEN, msg.clone(), None),
            AppError::Conflict(ref msg) => (StatusCode::CONFLICT, msg.clone(), None),
            AppError::ExternalCapabilityFailure(ref msg) => {
                tracing::error!("External capability failure: {}", msg);
                (StatusCode::BAD_GATEWAY, msg.clone(), None)
            }
            AppError::ConcurrencyAnomaly(ref msg) => {
                tracing::warn!("Concurrency anomaly: {}", msg);
                (StatusCode::CONFLICT, msg.clone(), None)
            }
        };

        let body = Json(ApiResponse::<()>::error(Some(message), errors));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_token_message_is_generic() {
        assert_eq!(AppError::InvalidToken.to_string(), INVALID_TOKEN_MESSAGE);
    }

    #[test]
    fn test_invalid_transition_names_states_and_reason() {
        let err = AppError::invalid_transition("completed", "finalized", "tenant review required");
        let msg = err.to_string();
        assert!(msg.contains("completed"));
        assert!(msg.contains("finalized"));
        assert!(msg.contains("tenant review required"));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::InvalidToken.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::invalid_transition("a", "b", "c")
                .into_response()
                .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::ExternalCapabilityFailure("down".into())
                .into_response()
                .status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::Validation("empty".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }
}
