use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use matchday_sync::api::routes::{router, ApiState};
use matchday_sync::config::Config;
use matchday_sync::db::{connect, FixtureStore};
use matchday_sync::error::Result;
use matchday_sync::provider::{ApiFootball, FixtureProvider};
use matchday_sync::sync::SyncScheduler;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let pool = connect(&cfg.db_path).await?;
    let store = FixtureStore::new(pool);
    info!("Database ready at {} ({} fixtures stored)", cfg.db_path, store.count().await?);

    // --- Provider + sync components ---
    let provider: Arc<dyn FixtureProvider> = Arc::new(ApiFootball::new(&cfg)?);
    let state = ApiState::new(&cfg, provider, store);

    if cfg.cron_secret.is_none() {
        warn!("CRON_SECRET not set: POST /sync/results will refuse every request");
    }

    // --- Live sync loop ---
    let scheduler = if cfg.live_sync_enabled {
        let handle = SyncScheduler::new(
            Arc::clone(&state.live),
            Duration::from_secs(cfg.live_sync_interval_secs),
        )
        .start();
        Some(handle)
    } else {
        warn!("LIVE_SYNC_ENABLED=false: live fixtures only update through POST /sync/live");
        None
    };

    // --- HTTP API server ---
    let app = router(state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = scheduler {
        handle.stop().await;
    }
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
