use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde_json::Value;

use crate::config::AppConfig;
use crate::fixtures_fetch::API_KEY_HEADER;
use crate::http_cache::fetch_cached;
use crate::http_client::http_client;

const TEAM_STATS_URL: &str = "https://v3.football.api-sports.io/teams/statistics";

// Season totals move once per matchday at most; predicting both sides of a
// fixture back to back should not cost four API calls.
const TEAM_STATS_MAX_AGE: Duration = Duration::from_secs(10 * 60);

/// Season totals for one team, the raw material of a feature vector.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamSeasonStats {
    pub shots_total: f64,
    pub shots_on_target: f64,
    pub fouls: f64,
    pub corners: f64,
}

pub fn fetch_team_stats(api_key: &str, config: &AppConfig, team_id: u32) -> Result<TeamSeasonStats> {
    let client = http_client()?;
    let url = format!(
        "{TEAM_STATS_URL}?team={team_id}&season={}&league={}",
        config.season, config.league_id
    );
    let body = fetch_cached(client, &url, &[(API_KEY_HEADER, api_key)], TEAM_STATS_MAX_AGE)
        .with_context(|| format!("team statistics request (team {team_id})"))?;
    parse_team_stats_json(&body)
}

/// The statistics payload drifts between plans and seasons; individual
/// stats default to 0 when absent. A missing `response` object is still
/// an error: it means the key or query is bad.
pub fn parse_team_stats_json(raw: &str) -> Result<TeamSeasonStats> {
    let root: Value =
        serde_json::from_str(raw.trim()).context("invalid team statistics json")?;
    let resp = root.get("response").unwrap_or(&Value::Null);
    if !resp.is_object() {
        return Err(anyhow!("team statistics response missing"));
    }

    Ok(TeamSeasonStats {
        shots_total: pick_f64(resp, &["shots", "total"]),
        shots_on_target: pick_f64(resp, &["shots", "on"]),
        fouls: pick_f64(resp, &["fouls", "total"]),
        corners: pick_f64(resp, &["corners", "total"]),
    })
}

fn pick_f64(value: &Value, path: &[&str]) -> f64 {
    let mut cur = value;
    for key in path {
        match cur.get(*key) {
            Some(next) => cur = next,
            None => return 0.0,
        }
    }
    as_f64_any(cur).unwrap_or(0.0)
}

fn as_f64_any(v: &Value) -> Option<f64> {
    if let Some(n) = v.as_f64() {
        return Some(n);
    }
    v.as_str()?.trim().parse::<f64>().ok()
}
