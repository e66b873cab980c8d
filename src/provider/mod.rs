//! Fixture provider seam.
//!
//! The sync loop, import and enrichment passes only talk to a
//! [`FixtureProvider`]; [`ApiFootball`] is the HTTP implementation.

pub mod api_football;
pub mod mapping;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::{AppError, Result};
use crate::types::{DetailKind, Fixture};

pub use api_football::ApiFootball;

#[async_trait]
pub trait FixtureProvider: Send + Sync {
    /// Every fixture the provider currently reports as in play (`live=all`).
    async fn live_fixtures(&self) -> Result<Vec<Fixture>>;

    /// Every fixture scheduled on `date` (UTC).
    async fn fixtures_by_date(&self, date: NaiveDate) -> Result<Vec<Fixture>>;

    /// Authoritative state for a batch of ids. Ids the provider does not know are
    /// simply absent from the result.
    async fn fixtures_by_ids(&self, ids: &[i64]) -> Result<Vec<Fixture>>;

    /// "Match Winner" odds from the first bookmaker, if any are published.
    async fn match_winner_odds(&self, fixture_id: i64) -> Result<Option<serde_json::Value>>;

    /// One detail blob for a fixture. `Ok(None)` when the provider has nothing yet
    /// or the fixture lacks the ids the lookup needs.
    async fn detail(&self, kind: DetailKind, fixture: &Fixture) -> Result<Option<serde_json::Value>>;
}

/// Unwrap a `{ response: [...], errors: {...} }` envelope.
///
/// A non-empty `errors` value (object or array) is a provider-level failure, and no
/// part of `response` is returned in that case.
pub fn parse_envelope(endpoint: &str, body: serde_json::Value) -> Result<Vec<serde_json::Value>> {
    let has_errors = match body.get("errors") {
        Some(serde_json::Value::Object(map)) => !map.is_empty(),
        Some(serde_json::Value::Array(items)) => !items.is_empty(),
        Some(serde_json::Value::Null) | None => false,
        Some(_) => true,
    };
    if has_errors {
        let detail = body.get("errors").map(|e| e.to_string()).unwrap_or_default();
        return Err(AppError::Provider(format!("{endpoint}: {detail}")));
    }

    match body.get("response") {
        Some(serde_json::Value::Array(items)) => Ok(items.clone()),
        Some(serde_json::Value::Null) | None => Ok(Vec::new()),
        Some(_) => Err(AppError::Provider(format!(
            "{endpoint}: response field was not an array"
        ))),
    }
}

/// `[1, 2, 3]` → `"1-2-3"`, the provider's `ids=` filter format.
pub fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join("-")
}
