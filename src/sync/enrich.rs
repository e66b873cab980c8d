use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::db::FixtureStore;
use crate::error::{AppError, Result};
use crate::provider::FixtureProvider;
use crate::types::DetailKind;

#[derive(Debug, Default, Clone, Serialize)]
pub struct EnrichReport {
    pub fixture_id: i64,
    /// Blobs fetched and merged by this pass.
    pub fetched: Vec<DetailKind>,
    /// Already stored, not re-fetched.
    pub skipped: Vec<DetailKind>,
    /// The provider had nothing (yet) for these.
    pub unavailable: Vec<DetailKind>,
    pub failed: Vec<DetailKind>,
}

/// Lazily fills a fixture's detail blobs (statistics, lineups, head-to-head,
/// standings, predictions). Core match fields are never written here.
pub struct Enricher {
    provider: Arc<dyn FixtureProvider>,
    store: FixtureStore,
}

impl Enricher {
    pub fn new(provider: Arc<dyn FixtureProvider>, store: FixtureStore) -> Self {
        Self { provider, store }
    }

    /// Fetch every detail blob the fixture does not have yet and merge it in.
    ///
    /// A fixture that is not stored is looked up by id and imported first; if the
    /// provider does not know it either, this is `NotFound`.
    pub async fn enrich(&self, fixture_id: i64) -> Result<EnrichReport> {
        let stored = match self.store.get(fixture_id).await? {
            Some(s) => s,
            None => {
                let found = self.provider.fixtures_by_ids(&[fixture_id]).await?;
                if found.is_empty() {
                    return Err(AppError::NotFound(format!("fixture {fixture_id}")));
                }
                for fixture in &found {
                    self.store.upsert(fixture).await?;
                }
                self.store
                    .get(fixture_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("fixture {fixture_id}")))?
            }
        };

        let mut report = EnrichReport {
            fixture_id,
            ..EnrichReport::default()
        };

        for kind in DetailKind::ALL {
            if stored.detail(kind).is_some() {
                report.skipped.push(kind);
                continue;
            }
            match self.provider.detail(kind, &stored.fixture).await {
                Ok(Some(blob)) => match self.store.merge_detail(fixture_id, kind, &blob).await {
                    Ok(true) => report.fetched.push(kind),
                    Ok(false) => {
                        warn!(fixture_id, detail = %kind, "Detail merge for {fixture_id} updated no row");
                        report.failed.push(kind);
                    }
                    Err(e) => {
                        warn!(fixture_id, detail = %kind, "Detail merge failed for {fixture_id}: {e}");
                        report.failed.push(kind);
                    }
                },
                Ok(None) => report.unavailable.push(kind),
                Err(e) => {
                    warn!(fixture_id, detail = %kind, "Detail fetch failed for {fixture_id}: {e}");
                    report.failed.push(kind);
                }
            }
        }

        info!(
            fixture_id,
            fetched = report.fetched.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Enriched fixture {fixture_id}: {} fetched, {} already stored",
            report.fetched.len(),
            report.skipped.len(),
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::tests::{fixture, memory_store};
    use crate::sync::testing::ScriptedProvider;
    use crate::types::MatchStatus;
    use serde_json::json;

    #[tokio::test]
    async fn fetches_only_missing_details_and_keeps_core_fields() {
        let store = memory_store().await;
        store.upsert(&fixture(8, "2H", Some(70), (Some(2), Some(2)))).await.unwrap();
        store
            .merge_detail(8, DetailKind::Standings, &json!([{ "league": "stored" }]))
            .await
            .unwrap();

        let provider = Arc::new(ScriptedProvider::default());
        {
            let mut details = provider.details.lock().unwrap();
            details.insert((8, DetailKind::Statistics), json!([{ "shots": 12 }]));
            details.insert((8, DetailKind::Lineups), json!([{ "formation": "4-3-3" }]));
            details.insert((8, DetailKind::Standings), json!([{ "league": "fresh" }]));
        }
        provider.failing_details.lock().unwrap().insert(DetailKind::Predictions);

        let enricher = Enricher::new(provider.clone(), store.clone());
        let report = enricher.enrich(8).await.unwrap();

        assert_eq!(report.fetched, vec![DetailKind::Statistics, DetailKind::Lineups]);
        assert_eq!(report.skipped, vec![DetailKind::Standings]);
        assert_eq!(report.unavailable, vec![DetailKind::HeadToHead]);
        assert_eq!(report.failed, vec![DetailKind::Predictions]);
        assert!(!provider.detail_calls.lock().unwrap().contains(&DetailKind::Standings));

        let stored = store.get(8).await.unwrap().unwrap();
        assert_eq!(stored.statistics, Some(json!([{ "shots": 12 }])));
        assert_eq!(stored.standings, Some(json!([{ "league": "stored" }])));
        assert_eq!(stored.fixture.status, MatchStatus::Live);
        assert_eq!(stored.fixture.score, "2-2");
        assert_eq!(stored.fixture.minute, Some(70));
    }

    #[tokio::test]
    async fn second_pass_skips_what_the_first_stored() {
        let store = memory_store().await;
        store.upsert(&fixture(8, "FT", Some(90), (Some(1), Some(0)))).await.unwrap();
        let provider = Arc::new(ScriptedProvider::default());
        provider
            .details
            .lock()
            .unwrap()
            .insert((8, DetailKind::Lineups), json!([{ "formation": "4-4-2" }]));

        let enricher = Enricher::new(provider, store);
        enricher.enrich(8).await.unwrap();
        let again = enricher.enrich(8).await.unwrap();

        assert!(again.fetched.is_empty());
        assert_eq!(again.skipped, vec![DetailKind::Lineups]);
    }

    #[tokio::test]
    async fn unknown_fixture_is_imported_first() {
        let store = memory_store().await;
        let provider = Arc::new(ScriptedProvider::default());
        provider.set_by_id(fixture(31, "NS", None, (None, None)));

        let enricher = Enricher::new(provider, store.clone());
        enricher.enrich(31).await.unwrap();

        assert_eq!(store.get(31).await.unwrap().unwrap().fixture.score, "-");
    }

    #[tokio::test]
    async fn store_failure_while_importing_is_a_database_error() {
        let store = memory_store().await;
        sqlx::query(
            "CREATE TRIGGER reject_inserts BEFORE INSERT ON fixtures \
             BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
        )
        .execute(store.pool())
        .await
        .unwrap();
        let provider = Arc::new(ScriptedProvider::default());
        provider.set_by_id(fixture(31, "NS", None, (None, None)));

        let enricher = Enricher::new(provider, store);
        let err = enricher.enrich(31).await.unwrap_err();

        assert!(matches!(err, AppError::Database(_)), "got {err:?}");
        assert_eq!(err.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn merge_that_updates_no_row_is_a_failure() {
        let store = memory_store().await;
        store.upsert(&fixture(8, "1H", Some(10), (Some(0), Some(0)))).await.unwrap();
        sqlx::query(
            "CREATE TRIGGER drop_lineups BEFORE UPDATE OF lineups ON fixtures \
             BEGIN SELECT RAISE(IGNORE); END;",
        )
        .execute(store.pool())
        .await
        .unwrap();
        let provider = Arc::new(ScriptedProvider::default());
        provider
            .details
            .lock()
            .unwrap()
            .insert((8, DetailKind::Lineups), json!([{ "formation": "3-5-2" }]));

        let enricher = Enricher::new(provider, store.clone());
        let report = enricher.enrich(8).await.unwrap();

        assert!(report.fetched.is_empty());
        assert_eq!(report.failed, vec![DetailKind::Lineups]);
        assert!(store.get(8).await.unwrap().unwrap().lineups.is_none());
    }

    #[tokio::test]
    async fn fixture_unknown_everywhere_is_not_found() {
        let store = memory_store().await;
        let enricher = Enricher::new(Arc::new(ScriptedProvider::default()), store);
        let err = enricher.enrich(404).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
