//! parkwatch server entry point.
//!
//! Starts the scheduler, the extraction worker pool, and the Axum HTTP
//! server, and wires a cancellation token through all of them for a
//! clean shutdown on Ctrl-C.

use std::sync::Arc;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use parkwatch::api;
use parkwatch::app_state::AppState;
use parkwatch::config::EngineConfig;
use parkwatch::pipeline::{spawn_workers, CircuitBreaker, JobQueue, JobRunner};
use parkwatch::profiles::{PostgresProfileStore, ProfileStore};
use parkwatch::providers;
use parkwatch::scheduler;
use parkwatch::session::SessionPool;
use parkwatch::store::postgres::PostgresRepository;
use parkwatch::store::Repository;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = EngineConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting parkwatch");

    // Database pool and migrations
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(std::time::Duration::from_secs(
            config.database_connect_timeout_secs,
        ))
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    // Stores
    let repo: Arc<dyn Repository> = Arc::new(PostgresRepository::new(pool.clone()));
    let profile_store: Arc<dyn ProfileStore> = Arc::new(PostgresProfileStore::new(pool));

    // Pipeline
    let breaker = Arc::new(CircuitBreaker::new(&config));
    let sessions = Arc::new(SessionPool::new(&config));
    let runner = Arc::new(JobRunner::new(
        providers::registry(),
        sessions,
        Arc::clone(&breaker),
        Arc::clone(&repo),
        Arc::clone(&profile_store),
        &config,
    ));

    let cancel = CancellationToken::new();
    let (queue, rx) = JobQueue::bounded(config.job_queue_capacity);
    let workers = spawn_workers(config.worker_count, rx, runner, cancel.clone());

    let scheduler_handle = tokio::spawn({
        let profile_store = Arc::clone(&profile_store);
        let config = config.clone();
        let cancel = cancel.clone();
        async move { scheduler::run(profile_store, queue, &config, cancel).await }
    });

    // Build application state and router
    let app_state = AppState {
        repo,
        breaker,
    };
    let app = Router::new()
        .merge(api::build_router())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown({
            let cancel = cancel.clone();
            async move {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("shutdown signal received");
                cancel.cancel();
            }
        })
        .await?;

    cancel.cancel();
    let _ = scheduler_handle.await;
    for worker in workers {
        let _ = worker.await;
    }
    tracing::info!("parkwatch stopped");
    Ok(())
}
