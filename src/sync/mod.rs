//! Fixture synchronization: the always-on live loop and the one-shot passes
//! (import, result check, detail enrichment) that share its lookup/upsert helpers.

pub mod enrich;
pub mod import;
pub mod live;
pub mod scheduler;

use tracing::warn;

use crate::config::FINISHED_LOOKUP_BATCH_SIZE;
use crate::db::FixtureStore;
use crate::provider::FixtureProvider;

pub use enrich::{EnrichReport, Enricher};
pub use import::{ImportPlan, ImportReport, ImportTarget, Importer, ResultCheckReport};
pub use live::{LiveSync, TickOutcome, TickReport};
pub use scheduler::{SchedulerHandle, SyncScheduler};

/// Split ids into request-sized groups, preserving order.
pub fn chunk_ids(ids: &[i64], size: usize) -> Vec<Vec<i64>> {
    ids.chunks(size.max(1)).map(|c| c.to_vec()).collect()
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LookupReport {
    /// Fixtures returned by the provider and written.
    pub upserted: usize,
    /// Of those, how many came back FINISHED or CANCELLED.
    pub terminal: usize,
    pub failed_batches: usize,
    pub failed_records: usize,
}

/// Re-query `ids` by id in batches of [`FINISHED_LOOKUP_BATCH_SIZE`] and upsert the
/// authoritative results.
///
/// Batches run one after another. A failed batch is logged and skipped; the
/// remaining batches still run. Ids the provider does not return are left as stored.
pub async fn lookup_and_upsert(
    provider: &dyn FixtureProvider,
    store: &FixtureStore,
    ids: &[i64],
) -> LookupReport {
    let mut report = LookupReport::default();

    for batch in chunk_ids(ids, FINISHED_LOOKUP_BATCH_SIZE) {
        let fixtures = match provider.fixtures_by_ids(&batch).await {
            Ok(f) => f,
            Err(e) => {
                report.failed_batches += 1;
                warn!(batch = ?batch, "Fixture lookup failed for batch of {}: {e}", batch.len());
                continue;
            }
        };

        report.terminal += fixtures.iter().filter(|f| f.status.is_terminal()).count();
        let written = store.upsert_many(&fixtures).await;
        report.upserted += written.upserted;
        report.failed_records += written.failed;
    }

    report
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------


#[cfg(test)]
mod tests {
    use super::testing::ScriptedProvider;
    use super::*;
    use crate::db::store::tests::{fixture, memory_store};
    use crate::types::MatchStatus;

    #[test]
    fn twenty_five_ids_chunk_into_ten_ten_five() {
        let ids: Vec<i64> = (1..=25).collect();
        let sizes: Vec<usize> = chunk_ids(&ids, FINISHED_LOOKUP_BATCH_SIZE)
            .iter()
            .map(|c| c.len())
            .collect();
        assert_eq!(sizes, vec![10, 10, 5]);
    }

    #[tokio::test]
    async fn lookups_are_issued_in_groups_of_ten() {
        let store = memory_store().await;
        let provider = ScriptedProvider::default();
        let ids: Vec<i64> = (100..125).collect();

        lookup_and_upsert(&provider, &store, &ids).await;

        let batches = provider.batches();
        let sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![10, 10, 5]);
        assert_eq!(batches.concat(), ids);
    }

    #[tokio::test]
    async fn failed_batch_does_not_stop_other_batches() {
        let store = memory_store().await;
        let provider = ScriptedProvider::default();
        let ids: Vec<i64> = (1..=25).collect();
        for id in &ids {
            provider.set_by_id(fixture(*id, "FT", Some(90), (Some(1), Some(0))));
        }
        // Second batch (11..=20) blows up.
        provider.failing_ids.lock().unwrap().insert(15);

        let report = lookup_and_upsert(&provider, &store, &ids).await;

        assert_eq!(report.failed_batches, 1);
        assert_eq!(report.upserted, 15);
        assert_eq!(report.terminal, 15);
        assert!(store.get(1).await.unwrap().is_some());
        assert!(store.get(15).await.unwrap().is_none());
        let last = store.get(25).await.unwrap().unwrap();
        assert_eq!(last.fixture.status, MatchStatus::Finished);
    }
}
