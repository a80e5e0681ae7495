use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthedUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_dialog).get(list_dialogs))
        .route("/:id/messages", get(list_messages).post(send_message))
        .route("/:id/messages/:mid/delivered", post(mark_delivered))
        .route("/:id/messages/:mid/read", post(mark_read))
}

#[derive(Debug, Deserialize)]
struct CreateDialogRequest {
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    email: String,
}

#[derive(Debug, Deserialize)]
struct SendMessageRequest {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct PageParams {
    #[serde(default)]
    limit: i64,
    #[serde(default)]
    before: i64,
}

async fn create_dialog(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthedUser>,
    Json(payload): Json<CreateDialogRequest>,
) -> AppResult<impl IntoResponse> {
    let target = if payload.user_id.is_empty() {
        payload.email.clone()
    } else {
        payload.user_id.clone()
    };
    if target.is_empty() {
        return Err(AppError::BadRequest("user_id or email required".into()));
    }
    let dialog_id = state.dialogs.create_direct(caller.user_id, &target).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "dialog_id": dialog_id })),
    ))
}

async fn list_dialogs(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthedUser>,
) -> AppResult<impl IntoResponse> {
    let dialogs = state.dialogs.list_dialogs(caller.user_id, 50).await?;
    Ok(Json(dialogs))
}

async fn list_messages(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthedUser>,
    Path(dialog_id): Path<Uuid>,
    Query(page): Query<PageParams>,
) -> AppResult<impl IntoResponse> {
    let messages = state
        .dialogs
        .list_messages(caller.user_id, dialog_id, page.limit, page.before)
        .await?;
    Ok(Json(messages))
}

async fn send_message(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthedUser>,
    Path(dialog_id): Path<Uuid>,
    Json(payload): Json<SendMessageRequest>,
) -> AppResult<impl IntoResponse> {
    if payload.text.is_empty() {
        return Err(AppError::BadRequest("text required".into()));
    }
    let message = state
        .dialogs
        .send_message(caller.user_id, dialog_id, &payload.text)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

async fn mark_delivered(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthedUser>,
    Path((dialog_id, message_id)): Path<(Uuid, i64)>,
) -> AppResult<impl IntoResponse> {
    state
        .dialogs
        .mark_delivered(caller.user_id, dialog_id, message_id)
        .await?;
    Ok(Json(json!({ "status": "ok" })))
}

async fn mark_read(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthedUser>,
    Path((dialog_id, message_id)): Path<(Uuid, i64)>,
) -> AppResult<impl IntoResponse> {
    state
        .dialogs
        .mark_read(caller.user_id, dialog_id, message_id)
        .await?;
    Ok(Json(json!({ "status": "ok" })))
}
