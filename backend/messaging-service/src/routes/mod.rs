pub mod dialogs;

use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tower_http::timeout::TimeoutLayer;

use crate::middleware;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let dialog_routes = dialogs::router().route_layer(axum::middleware::from_fn_with_state(
        state.validator.clone(),
        middleware::auth::require_auth,
    ));

    let router = Router::new()
        .nest("/v1/dialogs", dialog_routes)
        .route("/healthz", get(healthz))
        .layer(TimeoutLayer::new(Duration::from_secs(60)))
        .with_state(state);
    middleware::logging::add_tracing(router)
}

async fn healthz() -> &'static str {
    "ok"
}
