use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::debug;

use crate::config::{Config, API_KEY_HEADER};
use crate::error::{AppError, Result};
use crate::provider::mapping::{parse_fixtures, parse_match_winner_odds};
use crate::provider::{join_ids, parse_envelope, FixtureProvider};
use crate::types::{DetailKind, Fixture};

/// API-Football v3 client. One `reqwest::Client` shared by every call.
#[derive(Clone)]
pub struct ApiFootball {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ApiFootball {
    pub fn new(cfg: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.http_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: cfg.api_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
        })
    }

    /// GET `{base}/{endpoint}?{query}` and unwrap the envelope.
    async fn get(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Vec<serde_json::Value>> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!(endpoint, ?query, "provider request");

        let resp = self
            .http
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .query(query)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::Provider(format!("{endpoint}: HTTP {status}")));
        }

        let body: serde_json::Value = resp.json().await?;
        parse_envelope(endpoint, body)
    }
}

#[async_trait]
impl FixtureProvider for ApiFootball {
    async fn live_fixtures(&self) -> Result<Vec<Fixture>> {
        let items = self.get("fixtures", &[("live", "all".to_string())]).await?;
        Ok(parse_fixtures(&items))
    }

    async fn fixtures_by_date(&self, date: NaiveDate) -> Result<Vec<Fixture>> {
        let items = self
            .get("fixtures", &[("date", date.format("%Y-%m-%d").to_string())])
            .await?;
        Ok(parse_fixtures(&items))
    }

    async fn fixtures_by_ids(&self, ids: &[i64]) -> Result<Vec<Fixture>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let items = self.get("fixtures", &[("ids", join_ids(ids))]).await?;
        Ok(parse_fixtures(&items))
    }

    async fn match_winner_odds(&self, fixture_id: i64) -> Result<Option<serde_json::Value>> {
        let items = self
            .get("odds", &[("fixture", fixture_id.to_string())])
            .await?;
        Ok(parse_match_winner_odds(&items))
    }

    async fn detail(&self, kind: DetailKind, fixture: &Fixture) -> Result<Option<serde_json::Value>> {
        let items = match kind {
            DetailKind::Statistics => {
                self.get("fixtures/statistics", &[("fixture", fixture.id.to_string())])
                    .await?
            }
            DetailKind::Lineups => {
                self.get("fixtures/lineups", &[("fixture", fixture.id.to_string())])
                    .await?
            }
            DetailKind::Predictions => {
                self.get("predictions", &[("fixture", fixture.id.to_string())])
                    .await?
            }
            DetailKind::HeadToHead => {
                let (Some(home), Some(away)) = (fixture.home_team_id, fixture.away_team_id) else {
                    return Ok(None);
                };
                self.get(
                    "fixtures/headtohead",
                    &[("h2h", format!("{home}-{away}")), ("last", "10".to_string())],
                )
                .await?
            }
            DetailKind::Standings => {
                let (Some(league), Some(season)) = (fixture.league_id, fixture.season) else {
                    return Ok(None);
                };
                self.get(
                    "standings",
                    &[("league", league.to_string()), ("season", season.to_string())],
                )
                .await?
            }
        };

        if items.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::Value::Array(items)))
    }
}
