use axum::routing::get;
use axum::Router;

use crate::hub::{self, HubState};

pub fn build_router(state: HubState) -> Router {
    Router::new()
        .route("/v1/ws", get(hub::ws_handler))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}
