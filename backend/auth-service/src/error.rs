use auth_core::AuthError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("server start failure: {0}")]
    StartServer(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("too many requests")]
    RateLimited,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Auth(AuthError::Banned { reason, at }) => (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "banned", "reason": reason, "banned_at": at })),
            )
                .into_response(),
            AppError::Auth(err) => {
                let (status, message) = match &err {
                    AuthError::UserExists => (StatusCode::CONFLICT, "user already exists"),
                    AuthError::UserNotFound => (StatusCode::NOT_FOUND, "user not found"),
                    AuthError::InvalidCredentials => {
                        (StatusCode::UNAUTHORIZED, "invalid credentials")
                    }
                    AuthError::Inactive => (StatusCode::FORBIDDEN, "account not verified"),
                    AuthError::InvalidCode => (StatusCode::UNAUTHORIZED, "invalid code"),
                    AuthError::RefreshReuse => (StatusCode::UNAUTHORIZED, "refresh reuse detected"),
                    AuthError::SessionNotFound | AuthError::SessionRevoked => {
                        (StatusCode::UNAUTHORIZED, "invalid token")
                    }
                    AuthError::SessionExpired => (StatusCode::UNAUTHORIZED, "session expired"),
                    AuthError::NotAdmin => (StatusCode::FORBIDDEN, "forbidden"),
                    AuthError::InvalidStep => (StatusCode::BAD_REQUEST, "invalid step"),
                    AuthError::Banned { .. } => (StatusCode::FORBIDDEN, "banned"),
                    AuthError::Database(_) | AuthError::Internal(_) => {
                        tracing::error!(error = %err, "auth storage failure");
                        (StatusCode::INTERNAL_SERVER_ERROR, "internal error")
                    }
                };
                (status, Json(json!({ "error": message }))).into_response()
            }
            AppError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({ "error": "too many requests" })),
            )
                .into_response(),
            AppError::Database(e) => {
                tracing::error!(error = %e, "storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal error" })),
                )
                    .into_response()
            }
            AppError::Config(_) | AppError::StartServer(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "internal failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal error" })),
                )
                    .into_response()
            }
        }
    }
}
