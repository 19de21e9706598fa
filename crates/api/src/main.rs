//! API server entry point.

use std::sync::Arc;
use std::time::Duration;

use api::config::{Config, LogFormat};
use catalog_store::{InMemoryCatalogStore, PostgresCatalogStore};
use metrics_exporter_prometheus::PrometheusHandle;
use notifications::{LogNotifier, NotificationWorker, WorkerStats};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Upper bound on how long shutdown waits for pending notifications.
const WORKER_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn serve(app: axum::Router, config: &Config) {
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

/// Builds the app over Postgres or the seeded in-memory store and serves it.
///
/// The publisher moves into the app state, so the worker's channel closes
/// once the server has stopped and the state is dropped.
async fn run(config: &Config, metrics_handle: PrometheusHandle) -> JoinHandle<WorkerStats> {
    let (publisher, receiver) = notifications::channel(config.notification_buffer);
    let worker = tokio::spawn(NotificationWorker::new(receiver, LogNotifier).run());
    let publisher = Arc::new(publisher);

    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(url)
                .await
                .expect("failed to connect to PostgreSQL");
            let store = PostgresCatalogStore::new(pool);
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");

            let state = api::create_state(store, publisher);
            serve(api::create_app(state, metrics_handle), config).await;
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store");
            let store = InMemoryCatalogStore::new();
            api::demo::seed(&store).await;

            let state = api::create_state(store, publisher);
            serve(api::create_app(state, metrics_handle), config).await;
        }
    }

    worker
}

#[tokio::main]
async fn main() {
    // 1. Load configuration and initialize tracing
    let config = Config::from_env();
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Serve until a shutdown signal arrives
    let worker = run(&config, metrics_handle).await;

    // 4. Let the notification worker drain what checkout already published
    match tokio::time::timeout(WORKER_DRAIN_TIMEOUT, worker).await {
        Ok(Ok(stats)) => tracing::info!(
            delivered = stats.delivered,
            failed = stats.failed,
            "notification worker drained"
        ),
        Ok(Err(e)) => tracing::error!(error = %e, "notification worker panicked"),
        Err(_) => tracing::warn!("notification worker did not drain in time"),
    }

    tracing::info!("server shut down gracefully");
}
