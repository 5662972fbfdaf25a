use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use watchnext_api::{
    config::Config,
    db::{create_pool, PgTitleRepository, RecommendationCache},
    middleware::RateLimiter,
    routes::{create_router, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("watchnext_api=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = create_pool(&config.database_url, config.db_max_connections)
        .await
        .context("Failed to connect to PostgreSQL")?;
    tracing::info!(max_connections = config.db_max_connections, "Database pool ready");

    let repository = Arc::new(PgTitleRepository::new(
        pool,
        config.lookup_timeout(),
        config.recommendation_timeout(),
    ));

    let capacity = NonZeroUsize::new(config.cache_capacity)
        .context("CACHE_CAPACITY must be greater than zero")?;
    let cache = RecommendationCache::new(capacity, config.cache_ttl());

    let limiter = Arc::new(RateLimiter::from_config(&config)?);
    let _reaper = limiter.clone().spawn_reaper();

    let state = Arc::new(AppState::new(repository, cache));
    let app = create_router(state, limiter);

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(%addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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

    tracing::info!("Shutdown signal received");
}
