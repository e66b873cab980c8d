use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, warn};

use crate::db::FixtureStore;
use crate::error::{AppError, Result};
use crate::provider::FixtureProvider;
use crate::sync::lookup_and_upsert;
use crate::types::Fixture;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportTarget {
    Date(NaiveDate),
    Live,
}

impl std::fmt::Display for ImportTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportTarget::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            ImportTarget::Live => write!(f, "live=all"),
        }
    }
}

/// The windows one import pass covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPlan {
    pub targets: Vec<ImportTarget>,
}

impl ImportPlan {
    pub fn single(target: ImportTarget) -> Self {
        Self { targets: vec![target] }
    }

    /// Yesterday, today and tomorrow, then the live set. Live goes last so the
    /// freshest in-play state wins when a fixture shows up twice.
    pub fn default_window(today: NaiveDate) -> Self {
        Self {
            targets: vec![
                ImportTarget::Date(today - Duration::days(1)),
                ImportTarget::Date(today),
                ImportTarget::Date(today + Duration::days(1)),
                ImportTarget::Live,
            ],
        }
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct ImportReport {
    pub windows: usize,
    pub failed_windows: usize,
    /// Distinct fixtures fetched across all windows.
    pub fetched: usize,
    pub upserted: usize,
    pub failed_records: usize,
    pub odds_attached: usize,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct ResultCheckReport {
    pub candidates: usize,
    pub resolved: usize,
    pub finished: usize,
    pub failed_batches: usize,
}

/// Backfill / manual resync, and the cron-driven result check.
pub struct Importer {
    provider: Arc<dyn FixtureProvider>,
    store: FixtureStore,
    concurrency: usize,
    with_odds: bool,
}

impl Importer {
    pub fn new(
        provider: Arc<dyn FixtureProvider>,
        store: FixtureStore,
        concurrency: usize,
        with_odds: bool,
    ) -> Self {
        Self {
            provider,
            store,
            concurrency: concurrency.max(1),
            with_odds,
        }
    }

    /// Fetch every window in `plan` and upsert what came back. A failed window is
    /// logged and skipped; the pass only errors when every window failed.
    pub async fn run(&self, plan: &ImportPlan) -> Result<ImportReport> {
        let mut report = ImportReport {
            windows: plan.targets.len(),
            ..ImportReport::default()
        };
        let mut fixtures: BTreeMap<i64, Fixture> = BTreeMap::new();
        let mut last_error = None;

        for target in &plan.targets {
            let fetched = match target {
                ImportTarget::Date(date) => self.provider.fixtures_by_date(*date).await,
                ImportTarget::Live => self.provider.live_fixtures().await,
            };
            match fetched {
                Ok(batch) => {
                    info!(window = %target, count = batch.len(), "Import window {target}: {} fixtures", batch.len());
                    for f in batch {
                        fixtures.insert(f.id, f);
                    }
                }
                Err(e) => {
                    report.failed_windows += 1;
                    warn!(window = %target, "Import window {target} failed: {e}");
                    last_error = Some(e);
                }
            }
        }

        if report.windows > 0 && report.failed_windows == report.windows {
            return Err(last_error
                .unwrap_or_else(|| AppError::Provider("every import window failed".to_string())));
        }

        let mut fixtures: Vec<Fixture> = fixtures.into_values().collect();
        report.fetched = fixtures.len();

        if self.with_odds {
            report.odds_attached = self.attach_odds(&mut fixtures).await;
        }

        let written = self.store.upsert_many(&fixtures).await;
        report.upserted = written.upserted;
        report.failed_records = written.failed;

        info!(
            windows = report.windows,
            failed_windows = report.failed_windows,
            fetched = report.fetched,
            upserted = report.upserted,
            odds = report.odds_attached,
            "Import complete: {} fixtures upserted from {} windows",
            report.upserted,
            report.windows - report.failed_windows,
        );

        Ok(report)
    }

    /// Fetch "Match Winner" odds for every fixture that has not finished, at most
    /// `concurrency` requests at a time. Returns how many fixtures got odds.
    async fn attach_odds(&self, fixtures: &mut [Fixture]) -> usize {
        let wanted: Vec<i64> = fixtures
            .iter()
            .filter(|f| !f.status.is_terminal())
            .map(|f| f.id)
            .collect();

        let provider = Arc::clone(&self.provider);
        let results: Vec<(i64, Option<serde_json::Value>)> = stream::iter(wanted)
            .map(|id| {
                let provider = Arc::clone(&provider);
                async move {
                    match provider.match_winner_odds(id).await {
                        Ok(odds) => (id, odds),
                        Err(e) => {
                            warn!(fixture_id = id, "Odds fetch failed for {id}: {e}");
                            (id, None)
                        }
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut odds_by_id: BTreeMap<i64, serde_json::Value> = results
            .into_iter()
            .filter_map(|(id, odds)| odds.map(|o| (id, o)))
            .collect();

        let mut attached = 0;
        for fixture in fixtures.iter_mut() {
            if let Some(odds) = odds_by_id.remove(&fixture.id) {
                fixture.odds = Some(odds);
                attached += 1;
            }
        }
        attached
    }

    /// Re-query fixtures still stored as NOT_STARTED or LIVE well after kickoff and
    /// upsert their authoritative state.
    pub async fn check_results(&self, now: DateTime<Utc>, grace_mins: i64) -> Result<ResultCheckReport> {
        let cutoff = Duration::try_minutes(grace_mins)
            .and_then(|grace| now.checked_sub_signed(grace))
            .ok_or_else(|| AppError::BadRequest(format!("result check grace of {grace_mins} minutes is out of range")))?
            .to_rfc3339();
        let ids = self.store.overdue_ids(&cutoff).await?;

        let lookup = lookup_and_upsert(self.provider.as_ref(), &self.store, &ids).await;
        let report = ResultCheckReport {
            candidates: ids.len(),
            resolved: lookup.upserted,
            finished: lookup.terminal,
            failed_batches: lookup.failed_batches,
        };

        info!(
            candidates = report.candidates,
            resolved = report.resolved,
            finished = report.finished,
            failed_batches = report.failed_batches,
            "Result check: {}/{} overdue fixtures resolved ({} finished)",
            report.resolved,
            report.candidates,
            report.finished,
        );

        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
