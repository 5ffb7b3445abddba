use std::time::Duration;

use anyhow::{Context, Result};
use chrono::DateTime;
use serde::Deserialize;

use crate::config::AppConfig;
use crate::http_cache::fetch_cached;
use crate::http_client::http_client;

pub const API_KEY_HEADER: &str = "x-apisports-key";
const FIXTURES_URL: &str = "https://v3.football.api-sports.io/fixtures";

/// One upcoming fixture, flattened out of the API-Football response.
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureRow {
    pub id: u64,
    pub kickoff_utc: String,
    pub kickoff_label: String,
    pub home: String,
    pub away: String,
    pub home_id: u32,
    pub away_id: u32,
    pub league_name: String,
    pub round: String,
}

impl FixtureRow {
    pub fn label(&self) -> String {
        format!("{} | {} vs {}", self.kickoff_label, self.home, self.away)
    }
}

pub fn fetch_fixtures(api_key: &str, config: &AppConfig) -> Result<Vec<FixtureRow>> {
    let client = http_client()?;
    let url = format!(
        "{FIXTURES_URL}?league={}&season={}&next={}",
        config.league_id, config.season, config.next_count
    );
    // Kickoff lists go stale fast; always revalidate (the provider already
    // throttles how often this is called).
    let body = fetch_cached(client, &url, &[(API_KEY_HEADER, api_key)], Duration::ZERO)
        .context("fixtures request")?;
    parse_fixtures_json(&body)
}

#[derive(Debug, Deserialize)]
struct FixturesResponse {
    #[serde(default)]
    response: Vec<FixtureEntry>,
}

#[derive(Debug, Deserialize)]
struct FixtureEntry {
    fixture: Option<FixtureInfo>,
    teams: Option<FixtureTeams>,
    league: Option<LeagueInfo>,
}

#[derive(Debug, Deserialize)]
struct FixtureInfo {
    id: Option<u64>,
    #[serde(default)]
    date: String,
}

#[derive(Debug, Deserialize)]
struct FixtureTeams {
    home: Option<TeamRef>,
    away: Option<TeamRef>,
}

#[derive(Debug, Deserialize)]
struct TeamRef {
    id: Option<u32>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LeagueInfo {
    #[serde(default)]
    name: String,
    #[serde(default)]
    round: String,
}

/// Pure parse of the fixtures payload. Entries missing an id or a team are
/// skipped rather than failing the whole list.
pub fn parse_fixtures_json(raw: &str) -> Result<Vec<FixtureRow>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let data: FixturesResponse = serde_json::from_str(trimmed).context("invalid fixtures json")?;
    Ok(data.response.into_iter().filter_map(build_row).collect())
}

fn build_row(entry: FixtureEntry) -> Option<FixtureRow> {
    let fixture = entry.fixture?;
    let id = fixture.id?;
    let teams = entry.teams?;
    let home = teams.home?;
    let away = teams.away?;
    let (home_id, home_name) = (home.id?, home.name?);
    let (away_id, away_name) = (away.id?, away.name?);
    if home_name.trim().is_empty() || away_name.trim().is_empty() {
        return None;
    }

    let (league_name, round) = entry
        .league
        .map(|l| (l.name, l.round))
        .unwrap_or_default();

    Some(FixtureRow {
        id,
        kickoff_label: format_kickoff(&fixture.date),
        kickoff_utc: fixture.date,
        home: home_name,
        away: away_name,
        home_id,
        away_id,
        league_name,
        round,
    })
}

/// "2023-08-12T16:30:00+00:00" (or trailing Z) -> "12/08 16:30".
pub fn format_kickoff(raw: &str) -> String {
    let cleaned = raw.trim();
    if cleaned.is_empty() {
        return "TBD".to_string();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(cleaned) {
        return dt.format("%d/%m %H:%M").to_string();
    }
    if cleaned.len() >= 16 {
        return cleaned[..16].replace('T', " ");
    }
    cleaned.replace('T', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_kickoff_handles_rfc3339_and_garbage() {
        assert_eq!(format_kickoff("2023-08-12T16:30:00+00:00"), "12/08 16:30");
        assert_eq!(format_kickoff("2023-08-12T16:30:00Z"), "12/08 16:30");
        assert_eq!(format_kickoff(""), "TBD");
        assert_eq!(format_kickoff("2023-08-12T16:30"), "2023-08-12 16:30");
    }

    #[test]
    fn empty_body_parses_to_no_fixtures() {
        assert!(parse_fixtures_json("").unwrap().is_empty());
        assert!(parse_fixtures_json("null").unwrap().is_empty());
        assert!(parse_fixtures_json("{}").unwrap().is_empty());
    }

    #[test]
    fn entries_without_teams_are_skipped() {
        let raw = r#"{"response":[{"fixture":{"id":7,"date":"2023-08-12T16:30:00Z"}}]}"#;
        assert!(parse_fixtures_json(raw).unwrap().is_empty());
    }
}
