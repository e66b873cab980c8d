use std::collections::HashSet;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::warn;

use crate::db::models::FixtureRow;
use crate::error::Result;
use crate::types::{DetailKind, Fixture, MatchStatus, StoredFixture};

/// Open (creating if needed) the SQLite database and run the embedded migrations.
///
/// `:memory:` gets a single long-lived connection so every query sees the same database.
pub async fn connect(db_path: &str) -> Result<SqlitePool> {
    let opts = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))?.create_if_missing(true);

    let pool = if db_path == ":memory:" {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?
    } else {
        SqlitePoolOptions::new().connect_with(opts).await?
    };

    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpsertReport {
    pub upserted: usize,
    pub failed: usize,
}

/// The `fixtures` table. Every write is an upsert keyed by the external id.
#[derive(Clone)]
pub struct FixtureStore {
    pool: SqlitePool,
}

impl FixtureStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert or overwrite the core match fields of one fixture. Detail blobs are
    /// never touched; stored odds survive an upsert that carries none.
    pub async fn upsert(&self, f: &Fixture) -> Result<()> {
        let status = f.status.as_str();
        let odds = f.odds.as_ref().map(|o| o.to_string());
        let updated_at = now_secs();

        sqlx::query(
            r#"
            INSERT INTO fixtures (
                id, home_team_id, home_team, home_logo,
                away_team_id, away_team, away_logo,
                league_id, league, league_logo, season, country, venue, kickoff,
                status, status_short, minute, home_goals, away_goals, score,
                odds, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                home_team_id = excluded.home_team_id,
                home_team = excluded.home_team,
                home_logo = excluded.home_logo,
                away_team_id = excluded.away_team_id,
                away_team = excluded.away_team,
                away_logo = excluded.away_logo,
                league_id = excluded.league_id,
                league = excluded.league,
                league_logo = excluded.league_logo,
                season = excluded.season,
                country = excluded.country,
                venue = excluded.venue,
                kickoff = excluded.kickoff,
                status = excluded.status,
                status_short = excluded.status_short,
                minute = excluded.minute,
                home_goals = excluded.home_goals,
                away_goals = excluded.away_goals,
                score = excluded.score,
                odds = COALESCE(excluded.odds, fixtures.odds),
                updated_at = excluded.updated_at
            "#,
        )
        .bind(f.id)
        .bind(f.home_team_id)
        .bind(&f.home_team)
        .bind(&f.home_logo)
        .bind(f.away_team_id)
        .bind(&f.away_team)
        .bind(&f.away_logo)
        .bind(f.league_id)
        .bind(&f.league)
        .bind(&f.league_logo)
        .bind(f.season)
        .bind(&f.country)
        .bind(&f.venue)
        .bind(&f.kickoff)
        .bind(status)
        .bind(&f.status_short)
        .bind(f.minute)
        .bind(f.home_goals)
        .bind(f.away_goals)
        .bind(&f.score)
        .bind(odds)
        .bind(updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Upsert every fixture. A failing record is logged and counted; the rest are
    /// still written.
    pub async fn upsert_many(&self, fixtures: &[Fixture]) -> UpsertReport {
        let mut report = UpsertReport::default();
        for fixture in fixtures {
            match self.upsert(fixture).await {
                Ok(()) => report.upserted += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(fixture_id = fixture.id, "Fixture upsert failed for {}: {e}", fixture.id);
                }
            }
        }
        report
    }

    /// Ids of fixtures currently stored as LIVE.
    pub async fn live_ids(&self) -> Result<HashSet<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM fixtures WHERE status = ?")
            .bind(MatchStatus::Live.as_str())
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().collect())
    }

    /// Ids still NOT_STARTED or LIVE whose kickoff is before `cutoff` (RFC 3339, UTC).
    pub async fn overdue_ids(&self, cutoff: &str) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar(
            r#"
            SELECT id FROM fixtures
            WHERE status IN (?, ?) AND kickoff IS NOT NULL AND kickoff < ?
            ORDER BY id
            "#,
        )
        .bind(MatchStatus::NotStarted.as_str())
        .bind(MatchStatus::Live.as_str())
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    pub async fn get(&self, id: i64) -> Result<Option<StoredFixture>> {
        let row: Option<FixtureRow> = sqlx::query_as("SELECT * FROM fixtures WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(StoredFixture::from))
    }

    /// Stored fixtures, most recent kickoff first, optionally filtered by status.
    pub async fn list(&self, status: Option<MatchStatus>, limit: i64) -> Result<Vec<StoredFixture>> {
        let rows: Vec<FixtureRow> = match status {
            Some(s) => {
                sqlx::query_as(
                    "SELECT * FROM fixtures WHERE status = ? ORDER BY kickoff DESC, id LIMIT ?",
                )
                .bind(s.as_str())
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as("SELECT * FROM fixtures ORDER BY kickoff DESC, id LIMIT ?")
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows.into_iter().map(StoredFixture::from).collect())
    }

    /// Write one detail blob without disturbing core match fields.
    /// Returns false if the fixture is not stored.
    pub async fn merge_detail(&self, id: i64, kind: DetailKind, value: &serde_json::Value) -> Result<bool> {
        // `column()` is a fixed whitelist, never caller input.
        let sql = format!("UPDATE fixtures SET {} = ?, updated_at = ? WHERE id = ?", kind.column());
        let result = sqlx::query(&sql)
            .bind(value.to_string())
            .bind(now_secs())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count(&self) -> Result<i64> {
        let n = sqlx::query_scalar("SELECT COUNT(*) FROM fixtures")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::format_score;

    pub(crate) async fn memory_store() -> FixtureStore {
        FixtureStore::new(connect(":memory:").await.unwrap())
    }

    pub(crate) fn fixture(id: i64, short: &str, minute: Option<i64>, goals: (Option<i64>, Option<i64>)) -> Fixture {
        let status = MatchStatus::from_short(short);
        Fixture {
            id,
            home_team_id: Some(1),
            home_team: "Home FC".to_string(),
            home_logo: None,
            away_team_id: Some(2),
            away_team: "Away United".to_string(),
            away_logo: None,
            league_id: Some(39),
            league: "Premier League".to_string(),
            league_logo: None,
            season: Some(2026),
            country: Some("England".to_string()),
            venue: None,
            kickoff: Some("2026-10-18T13:00:00+00:00".to_string()),
            status,
            status_short: short.to_string(),
            minute,
            home_goals: goals.0,
            away_goals: goals.1,
            score: format_score(status, goals.0, goals.1),
            odds: None,
        }
    }

    #[tokio::test]
    async fn upserting_same_id_twice_keeps_one_row_with_latest_values() {
        let store = memory_store().await;

        store.upsert(&fixture(555, "1H", Some(10), (Some(0), Some(0)))).await.unwrap();
        store.upsert(&fixture(555, "2H", Some(70), (Some(2), Some(1)))).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let stored = store.get(555).await.unwrap().unwrap();
        assert_eq!(stored.fixture.status, MatchStatus::Live);
        assert_eq!(stored.fixture.status_short, "2H");
        assert_eq!(stored.fixture.minute, Some(70));
        assert_eq!(stored.fixture.score, "2-1");
    }

    #[tokio::test]
    async fn failing_record_does_not_stop_the_rest() {
        let store = memory_store().await;
        sqlx::query(
            "CREATE TRIGGER reject_two BEFORE INSERT ON fixtures WHEN NEW.id = 2 \
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .execute(store.pool())
        .await
        .unwrap();

        let report = store
            .upsert_many(&[
                fixture(1, "NS", None, (None, None)),
                fixture(2, "NS", None, (None, None)),
                fixture(3, "NS", None, (None, None)),
            ])
            .await;

        assert_eq!(report, UpsertReport { upserted: 2, failed: 1 });
        assert_eq!(store.count().await.unwrap(), 2);
        assert!(store.get(2).await.unwrap().is_none());
        assert!(store.get(3).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn live_ids_only_returns_live_rows() {
        let store = memory_store().await;
        let report = store
            .upsert_many(&[
                fixture(10, "1H", Some(5), (Some(0), Some(0))),
                fixture(20, "HT", Some(45), (Some(1), Some(1))),
                fixture(30, "FT", Some(90), (Some(3), Some(0))),
                fixture(40, "NS", None, (None, None)),
            ])
            .await;
        assert_eq!(report, UpsertReport { upserted: 4, failed: 0 });

        let ids = store.live_ids().await.unwrap();
        assert_eq!(ids, HashSet::from([10, 20]));
    }

    #[tokio::test]
    async fn upsert_preserves_odds_and_details() {
        let store = memory_store().await;
        let mut first = fixture(7, "NS", None, (None, None));
        first.odds = Some(serde_json::json!({ "home": 1.9 }));
        store.upsert(&first).await.unwrap();
        assert!(store
            .merge_detail(7, DetailKind::Lineups, &serde_json::json!([{ "team": "Home FC" }]))
            .await
            .unwrap());

        store.upsert(&fixture(7, "1H", Some(3), (Some(0), Some(0)))).await.unwrap();

        let stored = store.get(7).await.unwrap().unwrap();
        assert_eq!(stored.fixture.odds, Some(serde_json::json!({ "home": 1.9 })));
        assert_eq!(stored.lineups, Some(serde_json::json!([{ "team": "Home FC" }])));
        assert_eq!(stored.fixture.status, MatchStatus::Live);
    }

    #[tokio::test]
    async fn merge_detail_reports_missing_fixture() {
        let store = memory_store().await;
        let merged = store
            .merge_detail(404, DetailKind::Statistics, &serde_json::json!([]))
            .await
            .unwrap();
        assert!(!merged);
    }

    #[tokio::test]
    async fn overdue_ids_skip_terminal_and_future_fixtures() {
        let store = memory_store().await;
        let mut future = fixture(3, "NS", None, (None, None));
        future.kickoff = Some("2030-01-01T00:00:00+00:00".to_string());
        store
            .upsert_many(&[
                fixture(1, "NS", None, (None, None)),
                fixture(2, "FT", Some(90), (Some(1), Some(0))),
                future,
                fixture(4, "2H", Some(80), (Some(0), Some(0))),
            ])
            .await;

        let ids = store.overdue_ids("2026-10-18T20:00:00+00:00").await.unwrap();
        assert_eq!(ids, vec![1, 4]);
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let store = memory_store().await;
        store
            .upsert_many(&[
                fixture(1, "1H", Some(20), (Some(0), Some(0))),
                fixture(2, "FT", Some(90), (Some(1), Some(0))),
            ])
            .await;

        let finished = store.list(Some(MatchStatus::Finished), 10).await.unwrap();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].fixture.id, 2);
        assert_eq!(store.list(None, 10).await.unwrap().len(), 2);
    }
}
