use axum::extract::State;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde_json::json;

use crate::error::AppResult;
use crate::middleware::AuthedUser;
use crate::state::AppState;

pub async fn me(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthedUser>,
) -> AppResult<impl IntoResponse> {
    let user = state.store.user_by_id(caller.user_id).await?;
    Ok(Json(json!({
        "user_id": user.id,
        "device_id": caller.device_id,
        "email": user.email,
        "is_admin": user.is_admin,
        "banned_at": user.banned_at,
        "ban_reason": user.ban_reason,
    })))
}
