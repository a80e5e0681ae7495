use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

use auth_core::store::AuthStore;
use auth_core::{AccessValidator, PgAuthStore, TokenValidator};
use auth_service::db::admin_sessions::{AdminAuthStore, PgAdminAuthStore};
use auth_service::error::AppError;
use auth_service::mailer::{CodeSender, SmtpMailer};
use auth_service::middleware::RateLimiter;
use auth_service::services::{AdminAuthService, AuthConfig, AuthService};
use auth_service::{config, logging, migrations, routes, AppState};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    logging::init_tracing();
    let cfg = config::Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(16)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&cfg.database_url)
        .await
        .map_err(|e| AppError::StartServer(format!("db: {e}")))?;
    migrations::run_all(&pool)
        .await
        .map_err(|e| AppError::StartServer(format!("migrations: {e}")))?;

    let redis_client = redis::Client::open(cfg.redis_url.clone())
        .map_err(|e| AppError::StartServer(format!("redis: {e}")))?;
    let redis_conn = redis::aio::ConnectionManager::new(redis_client)
        .await
        .map_err(|e| AppError::StartServer(format!("redis: {e}")))?;

    let store: Arc<dyn AuthStore> = Arc::new(PgAuthStore::new(pool.clone()));
    let admin_store: Arc<dyn AdminAuthStore> = Arc::new(PgAdminAuthStore::new(pool.clone()));
    let mailer: Arc<dyn CodeSender> = Arc::new(SmtpMailer::new(&cfg.mail)?);

    let auth = Arc::new(AuthService::new(
        store.clone(),
        mailer.clone(),
        AuthConfig::default(),
    ));
    let admin = Arc::new(AdminAuthService::new(
        store.clone(),
        admin_store,
        auth.clone(),
        mailer,
    ));
    let validator: Arc<dyn TokenValidator> = Arc::new(AccessValidator::new(store.clone()));

    let state = AppState {
        auth,
        admin,
        store,
        validator,
    };
    let limiter = RateLimiter::new(redis_conn, cfg.rate_limit_per_minute);
    let app = routes::build_router(state, Some(limiter));

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::StartServer(format!("bind {addr}: {e}")))?;
    tracing::info!(%addr, "auth-service listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| AppError::StartServer(format!("serve: {e}")))?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "failed to install SIGTERM handler"),
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
