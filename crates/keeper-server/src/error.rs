//! HTTP error types for the Keeper server.
//!
//! Maps domain errors from `keeper-core` into HTTP responses. Every error
//! produces a JSON body with a machine-readable `error` field and a
//! human-readable `message`. Internal errors are logged with their detail
//! and answered with a generic message.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use keeper_core::{AccountError, RecordError, SessionError};

/// Application-level error returned from HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing, invalid or superseded credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The caller owns no such resource.
    #[error("not found: {0}")]
    NotFound(String),

    /// Client sent invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Resource already exists (duplicate title or login).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal error (storage, crypto, deadline).
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error".to_owned(),
                )
            }
        };

        let body = ErrorBody {
            error: error_type,
            message,
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<RecordError> for AppError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::Validation(_) => Self::BadRequest(err.to_string()),
            RecordError::NotFound { .. } => Self::NotFound(err.to_string()),
            RecordError::Conflict { .. } => Self::Conflict(err.to_string()),
            RecordError::Crypto(_) | RecordError::Storage(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        if err.is_rejection() {
            Self::Unauthorized(err.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Validation(_) => Self::BadRequest(err.to_string()),
            AccountError::Conflict { .. } => Self::Conflict(err.to_string()),
            AccountError::Storage(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use keeper_core::ValidationError;
    use keeper_storage::{RecordKind, StorageError};

    use super::*;

    #[test]
    fn status_mapping() {
        let cases: Vec<(AppError, StatusCode)> = vec![
            (
                RecordError::Validation(ValidationError::new("cvc", "must be 3 digits")).into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                RecordError::NotFound {
                    kind: RecordKind::Card,
                    title: "visa".into(),
                }
                .into(),
                StatusCode::NOT_FOUND,
            ),
            (
                RecordError::Conflict {
                    kind: RecordKind::Card,
                    title: "visa".into(),
                }
                .into(),
                StatusCode::CONFLICT,
            ),
            (SessionError::Superseded.into(), StatusCode::UNAUTHORIZED),
            (
                SessionError::Storage(StorageError::Transaction {
                    reason: "down".into(),
                })
                .into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AccountError::Conflict {
                    login: "a@b.com".into(),
                }
                .into(),
                StatusCode::CONFLICT,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[tokio::test]
    async fn internal_detail_is_not_leaked() {
        let response = AppError::Internal("db password=hunter2".into()).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("hunter2"));
        assert!(text.contains("internal server error"));
    }
}
