use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{service}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Auth errors
/// - E2xxx: Social errors (profiles, friends, posts)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    RateLimited,
    PayloadTooLarge,

    // Auth (E1xxx)
    InvalidCredentials,
    UsernameTaken,
    InvalidUsername,
    TokenExpired,
    TokenInvalid,
    RefreshTokenRevoked,
    PasswordTooWeak,
    PasswordMismatch,

    // Social (E2xxx)
    ProfileNotFound,
    PostNotFound,
    RelationshipNotFound,
    RequestAlreadySent,
    AlreadyFriends,
    CannotBefriendSelf,
    RequestNotPending,
    NotRequestReceiver,
    ImageUploadFailed,
    EmptyPost,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::RateLimited => "E0006",
            Self::PayloadTooLarge => "E0009",

            // Auth
            Self::InvalidCredentials => "E1001",
            Self::UsernameTaken => "E1002",
            Self::InvalidUsername => "E1003",
            Self::TokenExpired => "E1004",
            Self::TokenInvalid => "E1005",
            Self::RefreshTokenRevoked => "E1006",
            Self::PasswordTooWeak => "E1007",
            Self::PasswordMismatch => "E1008",

            // Social
            Self::ProfileNotFound => "E2001",
            Self::PostNotFound => "E2002",
            Self::RelationshipNotFound => "E2003",
            Self::RequestAlreadySent => "E2004",
            Self::AlreadyFriends => "E2005",
            Self::CannotBefriendSelf => "E2006",
            Self::RequestNotPending => "E2007",
            Self::NotRequestReceiver => "E2008",
            Self::ImageUploadFailed => "E2009",
            Self::EmptyPost => "E2010",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationError | Self::PasswordTooWeak
            | Self::PasswordMismatch | Self::InvalidUsername | Self::EmptyPost
            | Self::ImageUploadFailed => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound | Self::ProfileNotFound | Self::PostNotFound
            | Self::RelationshipNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::InvalidCredentials | Self::TokenExpired
            | Self::TokenInvalid | Self::RefreshTokenRevoked => StatusCode::UNAUTHORIZED,
            Self::CannotBefriendSelf | Self::NotRequestReceiver => StatusCode::FORBIDDEN,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::UsernameTaken | Self::RequestAlreadySent | Self::AlreadyFriends
            | Self::RequestNotPending => StatusCode::CONFLICT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// The error code this error will be reported with.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            AppError::Known { code, .. } => *code,
            AppError::Internal(_) => ErrorCode::InternalError,
            AppError::Database(diesel::result::Error::NotFound) => ErrorCode::NotFound,
            AppError::Database(_) => ErrorCode::InternalError,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message, details } => {
                let status = code.status_code();
                let mut resp = ApiErrorResponse::new(code.code(), message);
                if let Some(d) = details {
                    resp = resp.with_details(d.clone());
                }
                (status, resp)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "internal server error"),
                )
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                match err {
                    diesel::result::Error::NotFound => (
                        StatusCode::NOT_FOUND,
                        ApiErrorResponse::new("E0003", "resource not found"),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiErrorResponse::new("E0001", "database error"),
                    ),
                }
            }
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: AppError) -> serde_json::Value {
        let response = err.into_response();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn known_error_envelope() {
        let value = body_json(AppError::new(ErrorCode::PostNotFound, "post not found")).await;

        assert_eq!(value["success"], false);
        assert_eq!(value["error"]["code"], "E2002");
        assert_eq!(value["error"]["message"], "post not found");
        assert!(value["error"].get("details").is_none());
    }

    #[tokio::test]
    async fn details_are_serialized() {
        let err = AppError::with_details(
            ErrorCode::ValidationError,
            "bad form",
            serde_json::json!({ "email": ["invalid"] }),
        );
        let value = body_json(err).await;
        assert_eq!(value["error"]["details"]["email"][0], "invalid");
    }

    #[tokio::test]
    async fn diesel_not_found_maps_to_404() {
        let response = AppError::from(diesel::result::Error::NotFound).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn internal_error_hides_cause() {
        let err = AppError::from(anyhow::anyhow!("connection reset by peer"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let value = body_json(AppError::from(anyhow::anyhow!("connection reset by peer"))).await;
        assert_eq!(value["error"]["message"], "internal server error");
    }

    #[test]
    fn friend_conflicts_are_409() {
        assert_eq!(ErrorCode::AlreadyFriends.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::RequestAlreadySent.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::CannotBefriendSelf.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn error_code_of_database_errors() {
        assert_eq!(
            AppError::from(diesel::result::Error::NotFound).error_code(),
            ErrorCode::NotFound
        );
        assert_eq!(
            AppError::from(diesel::result::Error::RollbackTransaction).error_code(),
            ErrorCode::InternalError
        );
    }
}
