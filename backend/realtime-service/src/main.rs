use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

use auth_core::store::AuthStore;
use auth_core::{AccessValidator, PgAuthStore, TokenValidator};
use event_schema::{EventBus, RedisBus};
use realtime_service::error::AppError;
use realtime_service::hub::{ConnectionRegistry, HubState};
use realtime_service::{config, logging, routes};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    logging::init_tracing();
    let cfg = config::Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(8)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&cfg.database_url)
        .await
        .map_err(|e| AppError::StartServer(format!("db: {e}")))?;
    let redis_client = redis::Client::open(cfg.redis_url.clone())
        .map_err(|e| AppError::StartServer(format!("redis: {e}")))?;

    let store: Arc<dyn AuthStore> = Arc::new(PgAuthStore::new(pool));
    let validator: Arc<dyn TokenValidator> = Arc::new(AccessValidator::new(store));
    let bus: Arc<dyn EventBus> = Arc::new(RedisBus::new(redis_client));

    let state = HubState {
        registry: ConnectionRegistry::new(),
        validator,
        bus,
    };
    let app = routes::build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::StartServer(format!("bind {addr}: {e}")))?;
    tracing::info!(%addr, "realtime-service listening");
    axum::serve(listener, app)
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
