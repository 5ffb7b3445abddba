use std::env;

const DEFAULT_LEAGUE_ID: u32 = 39;
const DEFAULT_SEASON: u32 = 2023;
const DEFAULT_NEXT_COUNT: u32 = 10;
const DEFAULT_CSV_URL: &str = "https://www.football-data.co.uk/mmz4281/2324/E0.csv";

/// Runtime knobs, all overridable from the environment (`.env` is loaded
/// before this is built).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub league_id: u32,
    pub season: u32,
    pub next_count: u32,
    pub csv_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            league_id: DEFAULT_LEAGUE_ID,
            season: DEFAULT_SEASON,
            next_count: DEFAULT_NEXT_COUNT,
            csv_url: DEFAULT_CSV_URL.to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let league_id = parse_env_or("MATCHSIGHT_LEAGUE_ID", DEFAULT_LEAGUE_ID);
        let season = parse_env_or("MATCHSIGHT_SEASON", DEFAULT_SEASON);
        let next_count = parse_env_or("MATCHSIGHT_NEXT_COUNT", DEFAULT_NEXT_COUNT).clamp(1, 50);
        let csv_url = opt_env("MATCHSIGHT_CSV_URL").unwrap_or_else(|| DEFAULT_CSV_URL.to_string());
        Self {
            league_id,
            season,
            next_count,
            csv_url,
        }
    }
}

/// API key from the environment, used to pre-fill the key prompt.
pub fn env_api_key() -> Option<String> {
    opt_env("APIFOOTBALL_KEY")
}

fn parse_env_or(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|val| val.trim().parse::<u32>().ok())
        .unwrap_or(default)
}

fn opt_env(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|val| {
        let trimmed = val.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
