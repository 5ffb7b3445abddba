use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use csv::ReaderBuilder;
use ndarray::{Array1, Array2};
use serde::Deserialize;

use crate::config::AppConfig;
use crate::http_cache::fetch_cached;
use crate::http_client::http_client;

/// Column order of the training matrix. Inference feature vectors must be
/// laid out the same way (`FeatureVector::from_sides`).
pub const FEATURE_COLUMNS: [&str; 10] = [
    "FTHG", "FTAG", "HS", "AS", "HST", "AST", "HF", "AF", "HC", "AC",
];

pub const OUTCOME_HOME: usize = 0;
pub const OUTCOME_DRAW: usize = 1;
pub const OUTCOME_AWAY: usize = 2;

/// Cleaned historical matches, ready for model fitting.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub features: Array2<f64>,
    pub outcomes: Array1<usize>,
    pub home_goals: Array1<f64>,
    pub away_goals: Array1<f64>,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

// Season files carry dozens of betting columns; only the statistics the
// models consume are named here, the rest is ignored by serde.
#[derive(Debug, Deserialize)]
struct RawMatchRow {
    #[serde(rename = "FTHG")]
    full_time_home_goals: Option<f64>,
    #[serde(rename = "FTAG")]
    full_time_away_goals: Option<f64>,
    #[serde(rename = "HS")]
    home_shots: Option<f64>,
    #[serde(rename = "AS")]
    away_shots: Option<f64>,
    #[serde(rename = "HST")]
    home_shots_on_target: Option<f64>,
    #[serde(rename = "AST")]
    away_shots_on_target: Option<f64>,
    #[serde(rename = "HF")]
    home_fouls: Option<f64>,
    #[serde(rename = "AF")]
    away_fouls: Option<f64>,
    #[serde(rename = "HC")]
    home_corners: Option<f64>,
    #[serde(rename = "AC")]
    away_corners: Option<f64>,
    #[serde(rename = "FTR")]
    full_time_result: Option<String>,
}

impl RawMatchRow {
    fn features(&self) -> Option<[f64; 10]> {
        Some([
            self.full_time_home_goals?,
            self.full_time_away_goals?,
            self.home_shots?,
            self.away_shots?,
            self.home_shots_on_target?,
            self.away_shots_on_target?,
            self.home_fouls?,
            self.away_fouls?,
            self.home_corners?,
            self.away_corners?,
        ])
    }

    fn outcome(&self) -> Option<usize> {
        match self.full_time_result.as_deref().map(str::trim) {
            Some("H") => Some(OUTCOME_HOME),
            Some("D") => Some(OUTCOME_DRAW),
            Some("A") => Some(OUTCOME_AWAY),
            _ => None,
        }
    }
}

// Season files only gain rows on matchdays; refitting on a body a few
// hours old is fine.
const CSV_MAX_AGE: Duration = Duration::from_secs(6 * 60 * 60);

pub fn download_training_csv(config: &AppConfig) -> Result<String> {
    let client = http_client()?;
    fetch_cached(client, &config.csv_url, &[], CSV_MAX_AGE)
        .with_context(|| format!("download training csv {}", config.csv_url))
}

/// Download, clean and shape the historical season file.
pub fn load_training_set(config: &AppConfig) -> Result<TrainingSet> {
    let raw = download_training_csv(config)?;
    parse_training_csv(&raw)
}

/// Parse a season CSV, dropping every row with a missing statistic or an
/// unknown full-time result. Season files often end in ragged or blank
/// lines; those are dropped the same way.
pub fn parse_training_csv(raw: &str) -> Result<TrainingSet> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_reader(raw.as_bytes());

    let mut flat_features: Vec<f64> = Vec::new();
    let mut outcomes: Vec<usize> = Vec::new();
    let mut home_goals: Vec<f64> = Vec::new();
    let mut away_goals: Vec<f64> = Vec::new();

    for record in reader.deserialize::<RawMatchRow>() {
        let Ok(row) = record else {
            continue;
        };
        let (Some(features), Some(outcome)) = (row.features(), row.outcome()) else {
            continue;
        };
        home_goals.push(features[0]);
        away_goals.push(features[1]);
        flat_features.extend_from_slice(&features);
        outcomes.push(outcome);
    }

    if outcomes.is_empty() {
        return Err(anyhow!("no usable rows in training csv"));
    }

    let rows = outcomes.len();
    let features = Array2::from_shape_vec((rows, FEATURE_COLUMNS.len()), flat_features)
        .context("shape training feature matrix")?;

    Ok(TrainingSet {
        features,
        outcomes: Array1::from(outcomes),
        home_goals: Array1::from(home_goals),
        away_goals: Array1::from(away_goals),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Div,Date,HomeTeam,AwayTeam,FTHG,FTAG,FTR,HS,AS,HST,AST,HF,AF,HC,AC,B365H
E0,12/08/23,Arsenal,Forest,2,1,H,15,6,7,2,10,12,8,2,1.25
E0,12/08/23,Everton,Fulham,0,1,A,11,9,3,4,9,11,5,6,2.10
E0,13/08/23,Brentford,Spurs,2,2,D,12,14,5,6,12,10,6,7,3.00
E0,13/08/23,Burnley,City,,3,A,8,19,2,9,10,8,3,9,7.50
E0,14/08/23,Chelsea,Luton,3,0,X,20,4,9,1,8,13,9,1,1.40
";

    #[test]
    fn drops_rows_with_missing_cells_or_bad_result() {
        let set = parse_training_csv(SAMPLE).unwrap();
        // Burnley row has no FTHG, Chelsea row has result "X".
        assert_eq!(set.len(), 3);
        assert_eq!(set.features.dim(), (3, 10));
        assert_eq!(
            set.outcomes.to_vec(),
            vec![OUTCOME_HOME, OUTCOME_AWAY, OUTCOME_DRAW]
        );
    }

    #[test]
    fn feature_columns_follow_training_order() {
        let set = parse_training_csv(SAMPLE).unwrap();
        // First row: FTHG,FTAG,HS,AS,HST,AST,HF,AF,HC,AC.
        let expected = [2.0, 1.0, 15.0, 6.0, 7.0, 2.0, 10.0, 12.0, 8.0, 2.0];
        let first = set.features.row(0);
        assert_eq!(first.to_vec(), expected.to_vec());
        assert_eq!(set.home_goals[0], 2.0);
        assert_eq!(set.away_goals[0], 1.0);
    }

    #[test]
    fn empty_or_headerless_input_is_an_error() {
        assert!(parse_training_csv("").is_err());
        assert!(parse_training_csv("Div,Date\n").is_err());
    }

    #[test]
    fn ragged_trailing_lines_are_ignored() {
        let raw = format!("{SAMPLE}\n,,,\n");
        let set = parse_training_csv(&raw).unwrap();
        assert_eq!(set.len(), 3);
    }
}
