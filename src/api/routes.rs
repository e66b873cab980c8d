use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::config::{Config, DEFAULT_LIST_LIMIT};
use crate::db::FixtureStore;
use crate::error::AppError;
use crate::provider::FixtureProvider;
use crate::sync::{Enricher, ImportPlan, ImportTarget, Importer, LiveSync, TickOutcome};
use crate::types::{MatchStatus, StoredFixture};

#[derive(Clone)]
pub struct ApiState {
    pub store: FixtureStore,
    pub live: Arc<LiveSync>,
    pub importer: Arc<Importer>,
    pub enricher: Arc<Enricher>,
    pub health: Arc<HealthState>,
    pub latency: Arc<LatencyStats>,
    pub cron_secret: Option<String>,
    pub result_check_grace_mins: i64,
}

impl ApiState {
    /// Wire every sync component around one provider and one store.
    pub fn new(cfg: &Config, provider: Arc<dyn FixtureProvider>, store: FixtureStore) -> Self {
        let health = Arc::new(HealthState::new());
        let latency = Arc::new(LatencyStats::new());
        let live = Arc::new(LiveSync::new(
            Arc::clone(&provider),
            store.clone(),
            Arc::clone(&health),
            Arc::clone(&latency),
        ));
        let importer = Arc::new(Importer::new(
            Arc::clone(&provider),
            store.clone(),
            cfg.import_concurrency,
            cfg.import_with_odds,
        ));
        let enricher = Arc::new(Enricher::new(provider, store.clone()));

        Self {
            store,
            live,
            importer,
            enricher,
            health,
            latency,
            cron_secret: cfg.cron_secret.clone(),
            result_check_grace_mins: cfg.result_check_grace_mins,
        }
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/stats/sync", get(get_sync_stats))
        .route("/fixtures", get(get_fixtures))
        .route("/fixtures/:id", get(get_fixture))
        .route("/sync/fixtures", post(trigger_import))
        .route("/sync/live", post(trigger_live_tick))
        .route("/sync/results", post(trigger_result_check))
        .route("/matches/:id/details", post(trigger_enrich))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct FixturesQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct ImportQuery {
    /// `YYYY-MM-DD`
    pub date: Option<String>,
    /// Only `all` is meaningful.
    pub live: Option<String>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub fixtures: i64,
    pub last_tick_at: u64,
    pub last_live_count: u64,
    pub ticks_run: u64,
    pub ticks_skipped: u64,
    pub ticks_failed: u64,
}

#[derive(Serialize)]
pub struct SyncStatsResponse {
    pub samples: u64,
    pub p50_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
}

/// `{ success: true, message, report }`
#[derive(Serialize)]
pub struct TriggerResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub report: T,
}

fn triggered<T: Serialize>(message: String, report: T) -> Json<TriggerResponse<T>> {
    Json(TriggerResponse {
        success: true,
        message,
        report,
    })
}

// ---------------------------------------------------------------------------
// Read handlers
// ---------------------------------------------------------------------------

async fn get_health(State(state): State<ApiState>) -> Result<Json<HealthResponse>, AppError> {
    let fixtures = state.store.count().await?;
    Ok(Json(HealthResponse {
        status: "ok",
        fixtures,
        last_tick_at: state.health.last_tick_at(),
        last_live_count: state.health.last_live_count(),
        ticks_run: state.health.ticks_run(),
        ticks_skipped: state.health.ticks_skipped(),
        ticks_failed: state.health.ticks_failed(),
    }))
}

async fn get_sync_stats(State(state): State<ApiState>) -> Json<SyncStatsResponse> {
    let (p50, p95, p99) = state.latency.percentiles();
    let to_ms = |us: Option<u64>| us.map(|v| Duration::from_micros(v).as_secs_f64() * 1_000.0);
    Json(SyncStatsResponse {
        samples: state.latency.len(),
        p50_ms: to_ms(p50),
        p95_ms: to_ms(p95),
        p99_ms: to_ms(p99),
    })
}

async fn get_fixtures(
    State(state): State<ApiState>,
    Query(params): Query<FixturesQuery>,
) -> Result<Json<Vec<StoredFixture>>, AppError> {
    let status = params.status.as_deref().map(parse_status).transpose()?;
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, 1_000);
    Ok(Json(state.store.list(status, limit).await?))
}

async fn get_fixture(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<StoredFixture>, AppError> {
    state
        .store
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("fixture {id}")))
}

// ---------------------------------------------------------------------------
// Trigger handlers
// ---------------------------------------------------------------------------

async fn trigger_import(
    State(state): State<ApiState>,
    Query(params): Query<ImportQuery>,
) -> Result<Response, AppError> {
    let plan = import_plan(&params, Utc::now().date_naive())?;
    let report = state.importer.run(&plan).await?;
    let message = format!(
        "Imported {} fixtures from {} windows",
        report.upserted,
        report.windows - report.failed_windows
    );
    Ok(triggered(message, report).into_response())
}

async fn trigger_live_tick(State(state): State<ApiState>) -> Response {
    match state.live.try_tick().await {
        TickOutcome::Completed(report) => {
            let message = format!(
                "Live sync: {} live upserted, {} finished",
                report.live_upserted, report.finished
            );
            triggered(message, report).into_response()
        }
        TickOutcome::Skipped => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({
                "success": false,
                "error": "previous live sync tick still running",
            })),
        )
            .into_response(),
        TickOutcome::Failed(error) => (
            StatusCode::BAD_GATEWAY,
            Json(serde_json::json!({ "success": false, "error": error })),
        )
            .into_response(),
    }
}

async fn trigger_result_check(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    authorize_cron(&headers, state.cron_secret.as_deref())?;
    let report = state
        .importer
        .check_results(Utc::now(), state.result_check_grace_mins)
        .await?;
    let message = format!(
        "Checked {} overdue fixtures, {} finished",
        report.candidates, report.finished
    );
    Ok(triggered(message, report).into_response())
}

async fn trigger_enrich(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let report = state.enricher.enrich(id).await?;
    let message = format!("Fetched {} detail blobs for fixture {id}", report.fetched.len());
    Ok(triggered(message, report).into_response())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_status(s: &str) -> Result<MatchStatus, AppError> {
    match s.to_uppercase().as_str() {
        "NOT_STARTED" => Ok(MatchStatus::NotStarted),
        "LIVE" => Ok(MatchStatus::Live),
        "FINISHED" => Ok(MatchStatus::Finished),
        "CANCELLED" => Ok(MatchStatus::Cancelled),
        _ => Err(AppError::BadRequest(format!("unknown status '{s}'"))),
    }
}

fn import_plan(params: &ImportQuery, today: NaiveDate) -> Result<ImportPlan, AppError> {
    if let Some(live) = params.live.as_deref() {
        if live != "all" {
            return Err(AppError::BadRequest("live must be 'all'".to_string()));
        }
        return Ok(ImportPlan::single(ImportTarget::Live));
    }
    if let Some(date) = params.date.as_deref() {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| AppError::BadRequest(format!("date '{date}' is not YYYY-MM-DD")))?;
        return Ok(ImportPlan::single(ImportTarget::Date(date)));
    }
    Ok(ImportPlan::default_window(today))
}

/// `Authorization: Bearer <CRON_SECRET>`. With no secret configured the endpoint
/// refuses to run at all.
fn authorize_cron(headers: &HeaderMap, secret: Option<&str>) -> Result<(), AppError> {
    let Some(secret) = secret else {
        return Err(AppError::Config("CRON_SECRET is not configured".to_string()));
    };
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);
    match token {
        Some(t) if t == secret => Ok(()),
        _ => Err(AppError::Unauthorized),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::tests::{fixture, memory_store};
    use crate::sync::testing::ScriptedProvider;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    async fn app(provider: Arc<ScriptedProvider>) -> (Router, FixtureStore) {
        let store = memory_store().await;
        let state = ApiState::new(&Config::for_tests(), provider, store.clone());
        (router(state), store)
    }

    async fn json_body(resp: Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post(uri: &str) -> Request<Body> {
        Request::post(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn fixture_lookup_returns_stored_row_or_404() {
        let (app, store) = app(Arc::new(ScriptedProvider::default())).await;
        store.upsert(&fixture(555, "1H", Some(40), (Some(1), Some(0)))).await.unwrap();

        let resp = app
            .clone()
            .oneshot(Request::get("/fixtures/555").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["id"], 555);
        assert_eq!(body["status"], "LIVE");
        assert_eq!(body["score"], "1-0");

        let resp = app
            .oneshot(Request::get("/fixtures/1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(resp).await["success"], false);
    }

    #[tokio::test]
    async fn result_check_requires_bearer_secret() {
        let (app, _) = app(Arc::new(ScriptedProvider::default())).await;

        let resp = app.clone().oneshot(post("/sync/results")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let wrong = Request::post("/sync/results")
            .header("authorization", "Bearer nope")
            .body(Body::empty())
            .unwrap();
        assert_eq!(app.clone().oneshot(wrong).await.unwrap().status(), StatusCode::UNAUTHORIZED);

        let ok = Request::post("/sync/results")
            .header("authorization", "Bearer s3cret")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(ok).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["report"]["candidates"], 0);
    }

    #[tokio::test]
    async fn live_trigger_runs_one_tick() {
        let provider = Arc::new(ScriptedProvider::default());
        provider.set_live(vec![fixture(7, "HT", Some(45), (Some(0), Some(1)))]);
        let (app, store) = app(provider).await;

        let resp = app.oneshot(post("/sync/live")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["report"]["live_upserted"], 1);
        assert_eq!(store.get(7).await.unwrap().unwrap().fixture.score, "0-1");
    }

    #[tokio::test]
    async fn provider_failure_maps_to_bad_gateway() {
        let provider = Arc::new(ScriptedProvider::default());
        *provider.live_fails.lock().unwrap() = true;
        let (app, _) = app(provider).await;

        let resp = app.clone().oneshot(post("/sync/live")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

        let resp = app.oneshot(post("/sync/fixtures?live=all")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(resp).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("rate limit"));
    }

    #[tokio::test]
    async fn import_trigger_validates_date() {
        let (app, _) = app(Arc::new(ScriptedProvider::default())).await;
        let resp = app.oneshot(post("/sync/fixtures?date=18-10-2026")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn import_trigger_by_date_upserts() {
        let provider = Arc::new(ScriptedProvider::default());
        provider.by_date.lock().unwrap().insert(
            NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
            vec![fixture(1, "NS", None, (None, None)), fixture(2, "NS", None, (None, None))],
        );
        let (app, store) = app(provider).await;

        let resp = app.oneshot(post("/sync/fixtures?date=2026-10-18")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["report"]["upserted"], 2);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn fixtures_listing_rejects_unknown_status() {
        let (app, _) = app(Arc::new(ScriptedProvider::default())).await;
        let resp = app
            .oneshot(Request::get("/fixtures?status=paused").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn default_import_plan_when_no_params() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let plan = import_plan(&ImportQuery { date: None, live: None }, today).unwrap();
        assert_eq!(plan, ImportPlan::default_window(today));
    }
}
