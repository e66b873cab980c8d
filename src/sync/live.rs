use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::db::FixtureStore;
use crate::error::Result;
use crate::provider::FixtureProvider;
use crate::sync::lookup_and_upsert;

/// Counts for one tick, also returned by the manual `/sync/live` trigger.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Fixtures in the provider's live set that were written.
    pub live_upserted: usize,
    /// Stored-as-LIVE fixtures missing from the live set.
    pub candidates: usize,
    /// Candidates whose lookup came back and was written.
    pub resolved: usize,
    /// Of the resolved, how many are now FINISHED or CANCELLED.
    pub finished: usize,
    pub failed_batches: usize,
    pub failed_records: usize,
}

#[derive(Debug)]
pub enum TickOutcome {
    Completed(TickReport),
    /// The previous tick still held the guard.
    Skipped,
    Failed(String),
}

/// Fixtures we believed live that the provider no longer reports as live.
/// Sorted so lookups batch deterministically.
pub fn finished_candidates(local_live: &HashSet<i64>, provider_live: &HashSet<i64>) -> Vec<i64> {
    let mut ids: Vec<i64> = local_live.difference(provider_live).copied().collect();
    ids.sort_unstable();
    ids
}

/// Keeps stored fixture state in line with the provider's live feed.
///
/// Absence from the live feed only makes a fixture a *candidate*: FINISHED is
/// written solely from the by-id lookup, never inferred.
pub struct LiveSync {
    provider: Arc<dyn FixtureProvider>,
    store: FixtureStore,
    health: Arc<HealthState>,
    latency: Arc<LatencyStats>,
    /// Held for the whole tick body; a tick that finds it taken is skipped.
    busy: Mutex<()>,
}

impl LiveSync {
    pub fn new(
        provider: Arc<dyn FixtureProvider>,
        store: FixtureStore,
        health: Arc<HealthState>,
        latency: Arc<LatencyStats>,
    ) -> Self {
        Self {
            provider,
            store,
            health,
            latency,
            busy: Mutex::new(()),
        }
    }

    /// Run one tick unless another is in flight. Never returns an error: failures
    /// are logged and recorded so the scheduler can simply go on.
    pub async fn try_tick(&self) -> TickOutcome {
        let Ok(_guard) = self.busy.try_lock() else {
            self.health.inc_ticks_skipped();
            debug!("Live sync tick skipped: previous tick still running");
            return TickOutcome::Skipped;
        };

        let started = Instant::now();
        let outcome = match self.tick().await {
            Ok(report) => {
                self.health.record_tick(report.live_upserted as u64);
                TickOutcome::Completed(report)
            }
            Err(e) => {
                self.health.inc_ticks_failed();
                error!("Live sync tick failed: {e}");
                TickOutcome::Failed(e.to_string())
            }
        };
        self.latency.record(started.elapsed());
        outcome
    }

    /// The tick body, without the overlap guard.
    pub async fn tick(&self) -> Result<TickReport> {
        let live = self.provider.live_fixtures().await?;
        let local_live = self.store.live_ids().await?;

        let provider_live: HashSet<i64> = live.iter().map(|f| f.id).collect();
        let candidates = finished_candidates(&local_live, &provider_live);

        let mut report = TickReport {
            candidates: candidates.len(),
            ..TickReport::default()
        };

        if !live.is_empty() {
            let written = self.store.upsert_many(&live).await;
            report.live_upserted = written.upserted;
            report.failed_records += written.failed;
        }

        if !candidates.is_empty() {
            let lookup = lookup_and_upsert(self.provider.as_ref(), &self.store, &candidates).await;
            report.resolved = lookup.upserted;
            report.finished = lookup.terminal;
            report.failed_batches = lookup.failed_batches;
            report.failed_records += lookup.failed_records;

            let unresolved = candidates.len().saturating_sub(lookup.upserted);
            if unresolved > 0 {
                warn!(unresolved, "{unresolved} finished candidates not confirmed; retrying next tick");
            }
        }

        info!(
            live_upserted = report.live_upserted,
            candidates = report.candidates,
            resolved = report.resolved,
            finished = report.finished,
            failed_batches = report.failed_batches,
            "Live sync: {} live upserted, {}/{} candidates resolved ({} finished)",
            report.live_upserted,
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
