use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Match status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    NotStarted,
    Live,
    Finished,
    Cancelled,
}

impl MatchStatus {
    /// Map a provider short-status code to the local status.
    pub fn from_short(code: &str) -> Self {
        match code {
            "1H" | "HT" | "2H" | "ET" | "P" | "BT" => MatchStatus::Live,
            "FT" | "AET" | "PEN" => MatchStatus::Finished,
            "PST" | "CANC" | "ABD" => MatchStatus::Cancelled,
            _ => MatchStatus::NotStarted,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::NotStarted => "NOT_STARTED",
            MatchStatus::Live => "LIVE",
            MatchStatus::Finished => "FINISHED",
            MatchStatus::Cancelled => "CANCELLED",
        }
    }

    /// Parse the stored column value. Unknown values fall back to NOT_STARTED.
    pub fn parse(s: &str) -> Self {
        match s {
            "LIVE" => MatchStatus::Live,
            "FINISHED" => MatchStatus::Finished,
            "CANCELLED" => MatchStatus::Cancelled,
            _ => MatchStatus::NotStarted,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MatchStatus::Finished | MatchStatus::Cancelled)
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `"-"` before kickoff, otherwise `"<home>-<away>"` with missing goals as 0.
pub fn format_score(status: MatchStatus, home: Option<i64>, away: Option<i64>) -> String {
    if status == MatchStatus::NotStarted {
        return "-".to_string();
    }
    format!("{}-{}", home.unwrap_or(0), away.unwrap_or(0))
}

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

/// Core match fields mirrored from the provider. Written on every upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
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
    /// RFC 3339 kickoff, normalized to UTC.
    pub kickoff: Option<String>,
    pub status: MatchStatus,
    /// Raw provider short-status code (`1H`, `FT`, ...).
    pub status_short: String,
    pub minute: Option<i64>,
    pub home_goals: Option<i64>,
    pub away_goals: Option<i64>,
    pub score: String,
    pub odds: Option<serde_json::Value>,
}

/// A fixture as stored, with lazily fetched detail blobs.
#[derive(Debug, Clone, Serialize)]
pub struct StoredFixture {
    #[serde(flatten)]
    pub fixture: Fixture,
    pub statistics: Option<serde_json::Value>,
    pub lineups: Option<serde_json::Value>,
    pub head_to_head: Option<serde_json::Value>,
    pub standings: Option<serde_json::Value>,
    pub predictions: Option<serde_json::Value>,
    pub updated_at: i64,
}

impl StoredFixture {
    pub fn detail(&self, kind: DetailKind) -> Option<&serde_json::Value> {
        match kind {
            DetailKind::Statistics => self.statistics.as_ref(),
            DetailKind::Lineups => self.lineups.as_ref(),
            DetailKind::HeadToHead => self.head_to_head.as_ref(),
            DetailKind::Standings => self.standings.as_ref(),
            DetailKind::Predictions => self.predictions.as_ref(),
        }
    }
}

// ---------------------------------------------------------------------------
// Detail blobs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailKind {
    Statistics,
    Lineups,
    HeadToHead,
    Standings,
    Predictions,
}

impl DetailKind {
    pub const ALL: [DetailKind; 5] = [
        DetailKind::Statistics,
        DetailKind::Lineups,
        DetailKind::HeadToHead,
        DetailKind::Standings,
        DetailKind::Predictions,
    ];

    /// Column holding this blob in the `fixtures` table.
    pub fn column(&self) -> &'static str {
        match self {
            DetailKind::Statistics => "statistics",
            DetailKind::Lineups => "lineups",
            DetailKind::HeadToHead => "head_to_head",
            DetailKind::Standings => "standings",
            DetailKind::Predictions => "predictions",
        }
    }
}

impl std::fmt::Display for DetailKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.column())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
