use crate::error::{AppError, Result};

pub const API_FOOTBALL_URL: &str = "https://v3.football.api-sports.io";

/// Header carrying the provider key on every request.
pub const API_KEY_HEADER: &str = "x-apisports-key";

/// Finished-candidate lookups are issued with at most this many ids per request
/// (the provider caps `ids=` at 20; the free tier is happier with 10).
pub const FINISHED_LOOKUP_BATCH_SIZE: usize = 10;

/// Live sync interval (seconds).
pub const LIVE_SYNC_INTERVAL_SECS: u64 = 10;

/// Max concurrent per-fixture requests during an import pass.
pub const IMPORT_CONCURRENCY: usize = 4;

/// Outbound HTTP timeout (seconds).
pub const HTTP_TIMEOUT_SECS: u64 = 15;

/// A fixture still marked NOT_STARTED/LIVE this long after kickoff is due for a result check.
pub const RESULT_CHECK_GRACE_MINS: i64 = 110;

/// Accepted range for HTTP_TIMEOUT_SECS; anything else falls back to the default.
pub const HTTP_TIMEOUT_RANGE: std::ops::RangeInclusive<u64> = 1..=600;

/// Accepted range for RESULT_CHECK_GRACE_MINS (under ~70 days).
pub const RESULT_CHECK_GRACE_RANGE: std::ops::RangeInclusive<i64> = 1..=99_999;

/// Default row cap for the `/fixtures` listing.
pub const DEFAULT_LIST_LIMIT: i64 = 100;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub api_url: String,
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Run the always-on live loop (LIVE_SYNC_ENABLED)
    pub live_sync_enabled: bool,
    pub live_sync_interval_secs: u64,
    /// Shared secret for the cron-invoked result check (CRON_SECRET)
    pub cron_secret: Option<String>,
    pub import_concurrency: usize,
    /// Attach "Match Winner" odds to each imported fixture (IMPORT_WITH_ODDS)
    pub import_with_odds: bool,
    pub http_timeout_secs: u64,
    pub result_check_grace_mins: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("API_FOOTBALL_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AppError::Config("API_FOOTBALL_KEY must be set".to_string()))?;

        Ok(Self {
            api_key,
            api_url: std::env::var("API_FOOTBALL_URL")
                .unwrap_or_else(|_| API_FOOTBALL_URL.to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "fixtures.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            live_sync_enabled: std::env::var("LIVE_SYNC_ENABLED")
                .map(|v| !matches!(v.trim().to_lowercase().as_str(), "0" | "false" | "no" | "off"))
                .unwrap_or(true),
            live_sync_interval_secs: std::env::var("LIVE_SYNC_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(LIVE_SYNC_INTERVAL_SECS),
            cron_secret: std::env::var("CRON_SECRET")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            import_concurrency: std::env::var("IMPORT_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(IMPORT_CONCURRENCY),
            import_with_odds: std::env::var("IMPORT_WITH_ODDS")
                .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(false),
            http_timeout_secs: parse_in_range(
                std::env::var("HTTP_TIMEOUT_SECS").ok().as_deref(),
                HTTP_TIMEOUT_RANGE,
                HTTP_TIMEOUT_SECS,
            ),
            result_check_grace_mins: parse_in_range(
                std::env::var("RESULT_CHECK_GRACE_MINS").ok().as_deref(),
                RESULT_CHECK_GRACE_RANGE,
                RESULT_CHECK_GRACE_MINS,
            ),
        })
    }

    /// Configuration for tests and local tooling that never touch the network.
    pub fn for_tests() -> Self {
        Self {
            api_key: "test-key".to_string(),
            api_url: "http://127.0.0.1:9".to_string(),
            log_level: "debug".to_string(),
            db_path: ":memory:".to_string(),
            api_port: 0,
            live_sync_enabled: false,
            live_sync_interval_secs: LIVE_SYNC_INTERVAL_SECS,
            cron_secret: Some("s3cret".to_string()),
            import_concurrency: IMPORT_CONCURRENCY,
            import_with_odds: false,
            http_timeout_secs: HTTP_TIMEOUT_SECS,
            result_check_grace_mins: RESULT_CHECK_GRACE_MINS,
        }
    }
}

/// Parse an optional env value, keeping it only if it lies inside `range`.
fn parse_in_range<T>(raw: Option<&str>, range: std::ops::RangeInclusive<T>, default: T) -> T
where
    T: std::str::FromStr + PartialOrd,
{
    raw.and_then(|v| v.trim().parse::<T>().ok())
        .filter(|v| range.contains(v))
        .unwrap_or(default)
}
