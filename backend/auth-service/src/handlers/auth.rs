use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use auth_core::AuthError;

use crate::error::{AppError, AppResult};
use crate::handlers::{client_ip, user_agent};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub device_name: String,
    #[serde(default)]
    pub platform: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub device_name: String,
    #[serde(default)]
    pub platform: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    let email = payload.email.trim().to_string();
    if email.is_empty() || payload.password.is_empty() {
        return Err(AppError::BadRequest("email and password required".into()));
    }
    let user_id = state.auth.register(&email, &payload.password).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "user_id": user_id, "status": "verification_sent" })),
    ))
}

pub async fn verify(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<VerifyRequest>,
) -> AppResult<impl IntoResponse> {
    if payload.email.is_empty() || payload.code.is_empty() {
        return Err(AppError::BadRequest("email and code required".into()));
    }
    let issued = state
        .auth
        .verify(
            &payload.email,
            &payload.code,
            &payload.device_name,
            &payload.platform,
            &user_agent(&headers),
            &client_ip(&headers, addr),
        )
        .await?;
    Ok(Json(json!({
        "user_id": issued.user_id,
        "device_id": issued.device_id,
        "access_token": issued.access_token,
        "refresh_token": issued.refresh_token,
    })))
}

pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let issued = state
        .auth
        .login(
            &payload.email,
            &payload.password,
            &payload.device_name,
            &payload.platform,
            &user_agent(&headers),
            &client_ip(&headers, addr),
        )
        .await
        .map_err(|e| match e {
            // Do not leak which addresses are registered.
            AppError::Auth(AuthError::UserNotFound) => {
                AppError::Auth(AuthError::InvalidCredentials)
            }
            other => other,
        })?;
    Ok(Json(json!({
        "user_id": issued.user_id,
        "device_id": issued.device_id,
        "access_token": issued.access_token,
        "refresh_token": issued.refresh_token,
    })))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<impl IntoResponse> {
    let (access_token, refresh_token) = state.auth.refresh(&payload.refresh_token).await?;
    Ok(Json(json!({
        "access_token": access_token,
        "refresh_token": refresh_token,
    })))
}

pub async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<impl IntoResponse> {
    state.auth.logout(&payload.refresh_token).await?;
    Ok(Json(json!({ "status": "revoked" })))
}

pub async fn logout_all(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<impl IntoResponse> {
    state.auth.logout_all(&payload.refresh_token).await?;
    Ok(Json(json!({ "status": "revoked_all" })))
}
