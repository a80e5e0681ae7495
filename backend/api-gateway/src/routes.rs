use axum::routing::get;
use axum::Router;

use crate::proxy::{self, GatewayState};

pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/v1/ws", get(proxy::ws_proxy))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}
