use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

use auth_core::store::AuthStore;
use auth_core::{AccessValidator, PgAuthStore, TokenValidator};
use event_schema::{EventBus, RedisBus};
use messaging_service::db::{DialogStore, PgDialogStore};
use messaging_service::error::AppError;
use messaging_service::services::{DialogService, EventPublisher};
use messaging_service::{config, logging, migrations, routes, AppState};

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

    let redis_client = redis_client(&cfg.redis_url)?;
    let bus: Arc<dyn EventBus> = Arc::new(RedisBus::new(redis_client));

    let users: Arc<dyn AuthStore> = Arc::new(PgAuthStore::new(pool.clone()));
    let store: Arc<dyn DialogStore> = Arc::new(PgDialogStore::new(pool.clone()));
    let dialogs = Arc::new(
        DialogService::new(store, users.clone()).with_publisher(EventPublisher::new(bus)),
    );
    let validator: Arc<dyn TokenValidator> = Arc::new(AccessValidator::new(users));

    let state = AppState { dialogs, validator };
    let app = routes::build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::StartServer(format!("bind {addr}: {e}")))?;
    tracing::info!(%addr, "messaging-service listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::StartServer(format!("serve: {e}")))?;
    Ok(())
}

fn redis_client(url: &str) -> Result<redis::Client, AppError> {
    redis::Client::open(url).map_err(|e| AppError::StartServer(format!("redis: {e}")))
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
