use std::sync::Arc;
use std::time::Duration;

use task_core::{
    CachedTaskStore, InMemoryTaskStore, ListCache, PostgresTaskStore, RedisListCache, TaskError,
    TaskGauge, TaskService, TaskStore,
};
use task_server::config::{Config, StorageMode};
use task_server::AppState;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DATABASE_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
const REDIS_PING_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] task_server::config::ConfigError),

    #[error("storage initialization failed: {0}")]
    Storage(#[from] TaskError),

    #[error("server i/o error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "task_server=info,task_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let result = match config {
        Ok(config) => serve(config).await,
        Err(error) => Err(error.into()),
    };
    if let Err(error) = result {
        tracing::error!(%error, "task server failed");
        std::process::exit(1);
    }
    tracing::info!("server shutdown complete");
}

async fn serve(config: Config) -> Result<(), StartupError> {
    tracing::info!(storage_mode = ?config.storage_mode, "configuration loaded");

    let service = match config.storage_mode {
        StorageMode::InMemory => assemble(InMemoryTaskStore::new(), &config).await,
        StorageMode::Postgres => {
            let url = config.database_url.as_deref().unwrap_or_default();
            let store = PostgresTaskStore::connect(
                url,
                config.database_max_connections,
                DATABASE_ACQUIRE_TIMEOUT,
            )
            .await?;
            store.ensure_schema().await?;
            tracing::info!("postgres store ready");
            assemble(store, &config).await
        }
    };

    let state = AppState::new(service).with_request_timeout(config.request_timeout);
    let address = config.bind_address()?;
    let listener = TcpListener::bind(address).await?;
    tracing::info!(%address, "listening");

    axum::serve(listener, task_server::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Seed the gauge from the store, then put the list cache in front of it if
/// Redis answers.
async fn assemble<S: TaskStore + 'static>(store: S, config: &Config) -> TaskService {
    let gauge = Arc::new(TaskGauge::new());
    match store.count().await {
        Ok(count) => gauge.set(count),
        Err(error) => tracing::warn!(%error, "could not seed task count"),
    }

    let cache = match config.redis_addr.as_deref() {
        Some(address) => connect_cache(address).await,
        None => {
            tracing::info!("REDIS_ADDR not set, list cache disabled");
            None
        }
    };
    let store = CachedTaskStore::new(store, cache)
        .with_ttl(config.cache_ttl)
        .with_op_timeout(config.cache_op_timeout);
    TaskService::new(Arc::new(store), gauge)
}

async fn connect_cache(address: &str) -> Option<Arc<dyn ListCache>> {
    let cache = match RedisListCache::from_address(address) {
        Ok(cache) => cache,
        Err(error) => {
            tracing::warn!(%error, redis_addr = %address, "invalid redis address, list cache disabled");
            return None;
        }
    };
    match cache.ping(REDIS_PING_TIMEOUT).await {
        Ok(()) => {
            tracing::info!(redis_addr = %address, "list cache enabled");
            let cache: Arc<dyn ListCache> = Arc::new(cache);
            Some(cache)
        }
        Err(error) => {
            tracing::warn!(%error, redis_addr = %address, "redis unreachable, list cache disabled");
            None
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::warn!(%error, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::warn!(%error, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
