//! Provider JSON → local [`Fixture`].

use chrono::{DateTime, Utc};

use crate::types::{format_score, Fixture, MatchStatus};

/// Map one element of a `fixtures` response. Returns None only if the item has no
/// usable fixture id.
pub fn parse_fixture(v: &serde_json::Value) -> Option<Fixture> {
    let fx = v.get("fixture")?;
    let id = as_i64(fx.get("id")?)?;

    let status_short = fx
        .get("status")
        .and_then(|s| s.get("short"))
        .and_then(|s| s.as_str())
        .unwrap_or("NS")
        .to_string();
    let status = MatchStatus::from_short(&status_short);
    let minute = fx
        .get("status")
        .and_then(|s| s.get("elapsed"))
        .and_then(as_i64);

    let kickoff = fx
        .get("date")
        .and_then(|d| d.as_str())
        .map(normalize_kickoff);
    let venue = fx
        .get("venue")
        .and_then(|vn| vn.get("name"))
        .and_then(|n| n.as_str())
        .map(|s| s.to_string());

    let league = v.get("league");
    let home = v.get("teams").and_then(|t| t.get("home"));
    let away = v.get("teams").and_then(|t| t.get("away"));

    let home_goals = v.get("goals").and_then(|g| g.get("home")).and_then(as_i64);
    let away_goals = v.get("goals").and_then(|g| g.get("away")).and_then(as_i64);

    Some(Fixture {
        id,
        home_team_id: home.and_then(|t| t.get("id")).and_then(as_i64),
        home_team: str_field(home, "name").unwrap_or_default(),
        home_logo: str_field(home, "logo"),
        away_team_id: away.and_then(|t| t.get("id")).and_then(as_i64),
        away_team: str_field(away, "name").unwrap_or_default(),
        away_logo: str_field(away, "logo"),
        league_id: league.and_then(|l| l.get("id")).and_then(as_i64),
        league: str_field(league, "name").unwrap_or_default(),
        league_logo: str_field(league, "logo"),
        season: league.and_then(|l| l.get("season")).and_then(as_i64),
        country: str_field(league, "country"),
        venue,
        kickoff,
        status,
        status_short,
        minute,
        home_goals,
        away_goals,
        score: format_score(status, home_goals, away_goals),
        odds: None,
    })
}

/// Map a whole `fixtures` response, dropping unusable items.
pub fn parse_fixtures(items: &[serde_json::Value]) -> Vec<Fixture> {
    items.iter().filter_map(parse_fixture).collect()
}

/// Pull the "Match Winner" bet out of an `odds` response:
/// `{ "bookmaker": .., "home": .., "draw": .., "away": .. }`.
pub fn parse_match_winner_odds(items: &[serde_json::Value]) -> Option<serde_json::Value> {
    let bookmaker = items
        .first()?
        .get("bookmakers")?
        .as_array()?
        .first()?;
    let bet = bookmaker
        .get("bets")?
        .as_array()?
        .iter()
        .find(|b| b.get("name").and_then(|n| n.as_str()) == Some("Match Winner"))?;

    let mut home = None;
    let mut draw = None;
    let mut away = None;
    for value in bet.get("values")?.as_array()? {
        let odd = value
            .get("odd")
            .and_then(|o| o.as_f64().or_else(|| o.as_str().and_then(|s| s.parse().ok())));
        match value.get("value").and_then(|l| l.as_str()) {
            Some("Home") => home = odd,
            Some("Draw") => draw = odd,
            Some("Away") => away = odd,
            _ => {}
        }
    }
    if home.is_none() && draw.is_none() && away.is_none() {
        return None;
    }

    Some(serde_json::json!({
        "bookmaker": bookmaker.get("name").and_then(|n| n.as_str()),
        "home": home,
        "draw": draw,
        "away": away,
    }))
}

fn str_field(v: Option<&serde_json::Value>, key: &str) -> Option<String> {
    v.and_then(|o| o.get(key))
        .and_then(|s| s.as_str())
        .map(|s| s.to_string())
}

fn as_i64(v: &serde_json::Value) -> Option<i64> {
    v.as_i64().or_else(|| v.as_str().and_then(|s| s.parse().ok()))
}

/// Provider dates carry the league's local offset; store them as UTC. Unparseable
/// values are kept verbatim.
fn normalize_kickoff(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc).to_rfc3339())
        .unwrap_or_else(|_| raw.to_string())
}
