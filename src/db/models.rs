/// Database row types matching `migrations/0001_fixtures.sql`.
/// Used by sqlx for typed queries.
use crate::types::{Fixture, MatchStatus, StoredFixture};

#[derive(Debug, sqlx::FromRow)]
pub struct FixtureRow {
    pub id: i64,
    pub home_team_id: Option<i64>,
    pub home_team: String,
    pub home_logo: Option<String>,
    pub away_team_id: Option<i64>,
    pub away_team: String,
    pub away_logo: Option<String>,
    pub league_id: Option<i64>,
    pub league: String,
    pub league_logo: Option<String>,
    pub season: Option<i64>,
    pub country: Option<String>,
    pub venue: Option<String>,
    pub kickoff: Option<String>,
    pub status: String,
    pub status_short: String,
    pub minute: Option<i64>,
    pub home_goals: Option<i64>,
    pub away_goals: Option<i64>,
    pub score: String,
    pub odds: Option<String>,
    pub statistics: Option<String>,
    pub lineups: Option<String>,
    pub head_to_head: Option<String>,
    pub standings: Option<String>,
    pub predictions: Option<String>,
    pub updated_at: i64,
}

impl From<FixtureRow> for StoredFixture {
    fn from(r: FixtureRow) -> Self {
        StoredFixture {
            fixture: Fixture {
                id: r.id,
                home_team_id: r.home_team_id,
                home_team: r.home_team,
                home_logo: r.home_logo,
                away_team_id: r.away_team_id,
                away_team: r.away_team,
                away_logo: r.away_logo,
                league_id: r.league_id,
                league: r.league,
                league_logo: r.league_logo,
                season: r.season,
                country: r.country,
                venue: r.venue,
                kickoff: r.kickoff,
                status: MatchStatus::parse(&r.status),
                status_short: r.status_short,
                minute: r.minute,
                home_goals: r.home_goals,
                away_goals: r.away_goals,
                score: r.score,
                odds: json_column(r.odds),
            },
            statistics: json_column(r.statistics),
            lineups: json_column(r.lineups),
            head_to_head: json_column(r.head_to_head),
            standings: json_column(r.standings),
            predictions: json_column(r.predictions),
            updated_at: r.updated_at,
        }
    }
}

fn json_column(raw: Option<String>) -> Option<serde_json::Value> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
}
