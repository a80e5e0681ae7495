use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::timeout::TimeoutLayer;

use crate::handlers;
use crate::middleware::{self, RateLimiter};
use crate::state::AppState;

pub fn build_router(state: AppState, limiter: Option<RateLimiter>) -> Router {
    let mut auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/verify", post(handlers::auth::verify))
        .route("/login", post(handlers::auth::login))
        .route("/refresh", post(handlers::auth::refresh))
        .route("/logout", post(handlers::auth::logout))
        .route("/logout_all", post(handlers::auth::logout_all));

    let mut admin_routes = Router::new()
        .route("/login", post(handlers::admin::login))
        .route("/totp/init", post(handlers::admin::init_totp))
        .route("/totp", post(handlers::admin::verify_totp))
        .route("/email", post(handlers::admin::verify_email))
        .route("/logout", post(handlers::admin::logout));

    // The limiter covers only the credential endpoints.
    if let Some(limiter) = limiter {
        let limit_layer = axum::middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit::rate_limit,
        );
        auth_routes = auth_routes.layer(limit_layer.clone());
        admin_routes = admin_routes.layer(limit_layer);
    }

    let me_routes = Router::new()
        .route("/me", get(handlers::me::me))
        .route_layer(axum::middleware::from_fn_with_state(
            state.validator.clone(),
            middleware::bearer::require_auth,
        ));

    let v1 = Router::new()
        .nest("/auth", auth_routes)
        .nest("/admin/auth", admin_routes)
        .merge(me_routes);

    let router = Router::new()
        .nest("/v1", v1)
        .route("/healthz", get(healthz))
        .layer(TimeoutLayer::new(Duration::from_secs(60)))
        .with_state(state);
    middleware::logging::add_tracing(router)
}

async fn healthz() -> &'static str {
    "ok"
}
