use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use auth_core::{AuthError, TokenValidator};

use crate::error::AppError;

/// Caller identity inserted into request extensions after validation.
#[derive(Debug, Clone, Copy)]
pub struct AuthedUser {
    pub user_id: Uuid,
    pub device_id: Uuid,
    pub is_admin: bool,
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub async fn require_auth(
    State(validator): State<Arc<dyn TokenValidator>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers()).ok_or(AuthError::SessionNotFound)?;
    let info = validator.validate_token(token).await?;
    req.extensions_mut().insert(AuthedUser {
        user_id: info.user_id,
        device_id: info.device_id,
        is_admin: info.is_admin,
    });
    Ok(next.run(req).await)
}
