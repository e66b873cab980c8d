//! One-shot fixture import for backfill or manual resync.
//!
//! `import`             yesterday, today, tomorrow and the live set
//! `import live`        the live set only
//! `import 2026-10-18`  one day

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use matchday_sync::config::Config;
use matchday_sync::db::{connect, FixtureStore};
use matchday_sync::error::{AppError, Result};
use matchday_sync::provider::{ApiFootball, FixtureProvider};
use matchday_sync::sync::{ImportPlan, ImportTarget, Importer};

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

    let plan = match plan_from_arg(std::env::args().nth(1).as_deref()) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };

    if let Err(e) = run(cfg, plan).await {
        error!("Import failed: {e}");
        std::process::exit(1);
    }
}

fn plan_from_arg(arg: Option<&str>) -> Result<ImportPlan> {
    match arg {
        None => Ok(ImportPlan::default_window(Utc::now().date_naive())),
        Some("live") => Ok(ImportPlan::single(ImportTarget::Live)),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(|d| ImportPlan::single(ImportTarget::Date(d)))
            .map_err(|_| AppError::BadRequest(format!("usage: import [live|YYYY-MM-DD], got '{s}'"))),
    }
}

async fn run(cfg: Config, plan: ImportPlan) -> Result<()> {
    let store = FixtureStore::new(connect(&cfg.db_path).await?);
    let provider: Arc<dyn FixtureProvider> = Arc::new(ApiFootball::new(&cfg)?);
    let importer = Importer::new(provider, store, cfg.import_concurrency, cfg.import_with_odds);

    let report = importer.run(&plan).await?;
    info!(
        "Import finished: {} fetched, {} upserted, {} failed records, {} failed windows",
        report.fetched, report.upserted, report.failed_records, report.failed_windows,
    );
    Ok(())
}
