use anyhow::{Context, Result, anyhow};
use linfa::prelude::*;
use linfa_linear::{FittedLinearRegression, LinearRegression};
use linfa_logistic::{MultiFittedLogisticRegression, MultiLogisticRegression};
use ndarray::{Array1, Array2, Axis};

use crate::team_stats_fetch::TeamSeasonStats;
use crate::training_data::{OUTCOME_AWAY, OUTCOME_DRAW, OUTCOME_HOME, TrainingSet};

const MAX_ITERATIONS: u64 = 200;
// Keeps a runaway regressor from printing absurd scorelines.
const MAX_PREDICTED_GOALS: f64 = 9.0;

/// One inference row, laid out in training column order
/// (`training_data::FEATURE_COLUMNS`).
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub values: [f64; 10],
}

impl FeatureVector {
    /// The goal columns stay zero for an unplayed fixture; the remaining
    /// eight slots carry the season shot/foul/corner totals per side.
    pub fn from_sides(home: &TeamSeasonStats, away: &TeamSeasonStats) -> Self {
        Self {
            values: [
                0.0,
                0.0,
                home.shots_total,
                away.shots_total,
                home.shots_on_target,
                away.shots_on_target,
                home.fouls,
                away.fouls,
                home.corners,
                away.corners,
            ],
        }
    }

    fn as_row(&self) -> Array2<f64> {
        Array1::from(self.values.to_vec()).insert_axis(Axis(0))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchPrediction {
    /// Percentages, normalized to sum exactly 100.0.
    pub p_home: f32,
    pub p_draw: f32,
    pub p_away: f32,
    pub home_goals: u8,
    pub away_goals: u8,
}

/// The three fitted models: multinomial logistic regression for the
/// H/D/A outcome and one linear regressor per side's goal count.
pub struct MatchModels {
    outcome: MultiFittedLogisticRegression<f64, usize>,
    home_goals: FittedLinearRegression<f64>,
    away_goals: FittedLinearRegression<f64>,
    /// Feature columns the regressors were fitted on. The least-squares
    /// solve rejects a design matrix with a constant column, which short
    /// or degenerate season files can produce.
    regressor_columns: Vec<usize>,
    samples: usize,
}

impl MatchModels {
    pub fn fit(data: &TrainingSet) -> Result<Self> {
        if data.is_empty() {
            return Err(anyhow!("training set is empty"));
        }

        let regressor_columns = varying_columns(&data.features);
        if regressor_columns.is_empty() {
            return Err(anyhow!(
                "every feature is constant across the {} training rows",
                data.len()
            ));
        }
        let regressor_features = data.features.select(Axis(1), &regressor_columns);

        let outcome = MultiLogisticRegression::default()
            .max_iterations(MAX_ITERATIONS)
            .fit(&Dataset::new(data.features.clone(), data.outcomes.clone()))
            .context("fit outcome classifier")?;
        let home_goals = LinearRegression::new()
            .fit(&Dataset::new(
                regressor_features.clone(),
                data.home_goals.clone(),
            ))
            .context("fit home goals regressor")?;
        let away_goals = LinearRegression::new()
            .fit(&Dataset::new(regressor_features, data.away_goals.clone()))
            .context("fit away goals regressor")?;

        Ok(Self {
            outcome,
            home_goals,
            away_goals,
            regressor_columns,
            samples: data.len(),
        })
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn predict(&self, features: &FeatureVector) -> MatchPrediction {
        let x = features.as_row();

        // Probability columns follow ascending class labels, so with labels
        // 0/1/2 the columns are home, draw, away.
        let probs = self.outcome.predict_probabilities(&x);
        let row = probs.row(0);
        let (p_home, p_draw, p_away) =
            normalize_percent(row[OUTCOME_HOME], row[OUTCOME_DRAW], row[OUTCOME_AWAY]);

        let xr = x.select(Axis(1), &self.regressor_columns);
        let home_goals = clamp_goals(self.home_goals.predict(&xr)[0]);
        let away_goals = clamp_goals(self.away_goals.predict(&xr)[0]);

        MatchPrediction {
            p_home,
            p_draw,
            p_away,
            home_goals,
            away_goals,
        }
    }
}

fn varying_columns(features: &Array2<f64>) -> Vec<usize> {
    features
        .columns()
        .into_iter()
        .enumerate()
        .filter(|(_, col)| col.iter().any(|v| *v != col[0]))
        .map(|(idx, _)| idx)
        .collect()
}

fn normalize_percent(h: f64, d: f64, a: f64) -> (f32, f32, f32) {
    let mut p_home = (h.max(0.0) * 100.0) as f32;
    let mut p_draw = (d.max(0.0) * 100.0) as f32;
    let mut p_away = (a.max(0.0) * 100.0) as f32;

    // Normalize to exactly 100.0 to keep the UI stable.
    let sum = (p_home + p_draw + p_away).max(0.0001);
    p_home = p_home / sum * 100.0;
    p_draw = p_draw / sum * 100.0;
    p_away = p_away / sum * 100.0;
    // Put any tiny rounding residue into draw (least visually jarring).
    let residue = 100.0 - (p_home + p_draw + p_away);
    p_draw += residue;

    (p_home, p_draw, p_away)
}

fn clamp_goals(raw: f64) -> u8 {
    if !raw.is_finite() {
        return 0;
    }
    raw.round().clamp(0.0, MAX_PREDICTED_GOALS) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varying_columns_skips_constant_ones() {
        let features = Array2::from_shape_vec(
            (3, 4),
            vec![
                0.0, 1.0, 5.0, 2.0, //
                0.0, 1.0, 6.0, 2.0, //
                0.0, 1.0, 7.0, 2.0,
            ],
        )
        .unwrap();
        assert_eq!(varying_columns(&features), vec![2]);
    }

    #[test]
    fn normalize_percent_sums_to_100() {
        let (h, d, a) = normalize_percent(0.31, 0.27, 0.4);
        assert!((h + d + a - 100.0).abs() < 0.01);
        assert!(h > 0.0 && d > 0.0 && a > 0.0);
    }

    #[test]
    fn normalize_percent_handles_degenerate_input() {
        let (h, d, a) = normalize_percent(0.0, 0.0, 0.0);
        assert!((h + d + a - 100.0).abs() < 0.01);
    }

    #[test]
    fn clamp_goals_never_negative_and_capped() {
        assert_eq!(clamp_goals(-0.8), 0);
        assert_eq!(clamp_goals(1.4), 1);
        assert_eq!(clamp_goals(2.5), 3);
        assert_eq!(clamp_goals(40.0), 9);
        assert_eq!(clamp_goals(f64::NAN), 0);
    }

    #[test]
    fn feature_vector_keeps_goal_placeholders_zero() {
        let home = TeamSeasonStats {
            shots_total: 400.0,
            shots_on_target: 180.0,
            fouls: 300.0,
            corners: 190.0,
        };
        let away = TeamSeasonStats {
            shots_total: 310.0,
            shots_on_target: 120.0,
            fouls: 350.0,
            corners: 140.0,
        };
        let v = FeatureVector::from_sides(&home, &away);
        assert_eq!(v.values[0], 0.0);
        assert_eq!(v.values[1], 0.0);
        assert_eq!(v.values[2], 400.0);
        assert_eq!(v.values[3], 310.0);
        assert_eq!(v.values[9], 140.0);
    }
}
