mod api;
mod config;
mod storage;

use crate::api::AppState;
use crate::api::auth::TokenVerifier;
use crate::api::error::ErrorClassifier;
use crate::api::health::HealthState;
use crate::api::metrics::Metrics;
use crate::api::pagination::PageLimits;
use crate::config::AppConfig;
use crate::storage::PgReviewStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const MIGRATION_RETRY_DELAY: Duration = Duration::from_secs(1);
const MAX_MIGRATION_RETRY_DELAY: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to set tracing subscriber: {e}"))?;

    info!("Starting movie reviews API");

    let config = AppConfig::load()?;
    info!(
        environment = %config.environment,
        host = %config.server.host,
        port = config.server.port,
        "Configuration loaded"
    );

    let store = Arc::new(PgReviewStore::connect_lazy(&config.database)?);

    let page_limits = PageLimits::new(config.pagination.default_size, config.pagination.max_size);
    info!(
        default_size = page_limits.default_size(),
        max_size = page_limits.max_size(),
        "Pagination limits"
    );

    let health = Arc::new(HealthState::new());
    let state = AppState {
        store: store.clone(),
        verifier: Arc::new(TokenVerifier::new(
            &config.auth.jwt_secret,
            config.auth.issuer.as_deref(),
        )),
        metrics: Arc::new(Metrics::new()?),
        health: health.clone(),
        classifier: ErrorClassifier::new(config.environment),
        page_limits,
    };

    let app = api::router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    // Probes answer while the schema is brought up; startup completes once it is.
    let migrations = tokio::spawn({
        let store = store.clone();
        let health = health.clone();
        async move {
            complete_startup(&health, MIGRATION_RETRY_DELAY, || store.migrate()).await;
        }
    });

    info!("Server listening on http://{addr}");
    info!("Available endpoints:");
    info!("   GET    /get                     - All reviews (admin)");
    info!("   GET    /getByMovie/{{movieId}}    - Reviews for a movie");
    info!("   GET    /getByUser/{{userId}}      - Caller's reviews");
    info!("   POST   /add                     - Add review");
    info!("   PUT    /update/{{id}}             - Update review");
    info!("   DELETE /delete/{{id}}             - Delete review");
    info!("   GET    /health/{{liveness,readiness,startup}}");
    info!("   GET    /metrics");

    let draining = health.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            draining.mark_shutting_down();
        })
        .await?;

    migrations.abort();
    store.close().await;
    info!("Server shut down gracefully");

    Ok(())
}

/// Retry `step` with capped exponential backoff until it succeeds, then mark
/// the service started. Gives up quietly once shutdown has begun.
async fn complete_startup<F, Fut, E>(health: &HealthState, initial_delay: Duration, mut step: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    let mut delay = initial_delay;
    loop {
        if health.is_shutting_down() {
            return;
        }
        match step().await {
            Ok(()) => {
                health.mark_started();
                info!("Startup complete");
                return;
            }
            Err(e) => {
                warn!(error = %e, retry_in_ms = delay.as_millis() as u64, "Migrations failed, retrying");
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(MAX_MIGRATION_RETRY_DELAY);
            }
        }
    }
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
