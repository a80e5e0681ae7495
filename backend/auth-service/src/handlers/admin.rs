use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::handlers::{client_ip, user_agent};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
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
pub struct SessionTokenRequest {
    #[serde(default)]
    pub session_token: String,
}

#[derive(Debug, Deserialize)]
pub struct TotpRequest {
    #[serde(default)]
    pub session_token: String,
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailCodeRequest {
    #[serde(default)]
    pub session_token: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub device_name: String,
    #[serde(default)]
    pub platform: String,
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    #[serde(default)]
    pub refresh_token: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<AdminLoginRequest>,
) -> AppResult<impl IntoResponse> {
    let session_token = state.admin.login(&payload.email, &payload.password).await?;
    Ok(Json(json!({ "session_token": session_token, "next": "totp" })))
}

pub async fn init_totp(
    State(state): State<AppState>,
    Json(payload): Json<SessionTokenRequest>,
) -> AppResult<impl IntoResponse> {
    let secret = state.admin.init_totp(&payload.session_token).await?;
    Ok(Json(json!({ "secret": secret })))
}

pub async fn verify_totp(
    State(state): State<AppState>,
    Json(payload): Json<TotpRequest>,
) -> AppResult<impl IntoResponse> {
    state
        .admin
        .verify_totp(&payload.session_token, &payload.code)
        .await?;
    Ok(Json(json!({ "status": "email_code_sent", "next": "email_code" })))
}

pub async fn verify_email(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<EmailCodeRequest>,
) -> AppResult<impl IntoResponse> {
    let issued = state
        .admin
        .verify_email(
            &payload.session_token,
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

pub async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<LogoutRequest>,
) -> AppResult<impl IntoResponse> {
    if let Err(e) = state.admin.logout(&payload.refresh_token).await {
        tracing::warn!(error = %e, "admin logout failed");
        return Err(AppError::BadRequest("logout failed".into()));
    }
    Ok(Json(json!({ "status": "ok" })))
}
