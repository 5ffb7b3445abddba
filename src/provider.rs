use std::sync::mpsc::{Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::config::AppConfig;
use crate::fixtures_fetch::{self, FixtureRow};
use crate::model::{FeatureVector, MatchModels};
use crate::state::{Delta, ProviderCommand};
use crate::team_stats_fetch;
use crate::training_data;

const FIXTURES_THROTTLE: Duration = Duration::from_secs(30);

/// Background worker owning the API key and the fitted models. The UI
/// talks to it exclusively through `ProviderCommand` / `Delta` channels.
pub fn spawn_provider(tx: Sender<Delta>, cmd_rx: Receiver<ProviderCommand>, config: AppConfig) {
    thread::spawn(move || {
        let mut provider = Provider {
            tx,
            config,
            api_key: None,
            models: None,
            last_fixture_fetch: None,
        };
        while let Ok(cmd) = cmd_rx.recv() {
            provider.handle(cmd);
        }
    });
}

struct Provider {
    tx: Sender<Delta>,
    config: AppConfig,
    api_key: Option<String>,
    models: Option<MatchModels>,
    last_fixture_fetch: Option<Instant>,
}

impl Provider {
    fn handle(&mut self, cmd: ProviderCommand) {
        match cmd {
            ProviderCommand::Start { api_key } => self.start(api_key),
            ProviderCommand::FetchFixtures => self.fetch_fixtures(false),
            ProviderCommand::Predict { fixture } => self.predict(fixture),
        }
    }

    fn start(&mut self, api_key: String) {
        self.api_key = Some(api_key);
        self.busy(Some("Training models on historical matches".to_string()));
        match self.train() {
            Ok(samples) => {
                let _ = self.tx.send(Delta::ModelsReady { samples });
                self.log(format!("[INFO] Models fitted on {samples} historical matches"));
            }
            Err(err) => {
                self.log(format!("[ERROR] Training failed: {err:#}"));
            }
        }
        self.busy(Some("Fetching upcoming fixtures".to_string()));
        self.fetch_fixtures(true);
        self.busy(None);
    }

    fn train(&mut self) -> Result<usize> {
        let data = training_data::load_training_set(&self.config)?;
        let models = MatchModels::fit(&data)?;
        let samples = models.samples();
        self.models = Some(models);
        Ok(samples)
    }

    fn fetch_fixtures(&mut self, force: bool) {
        let Some(api_key) = self.api_key.clone() else {
            self.log("[WARN] Fixtures requested before an API key was set");
            return;
        };
        if !force
            && let Some(last) = self.last_fixture_fetch
            && last.elapsed() < FIXTURES_THROTTLE
        {
            self.log(format!(
                "[INFO] Fixture refresh throttled ({}s)",
                FIXTURES_THROTTLE.as_secs()
            ));
            return;
        }

        match fixtures_fetch::fetch_fixtures(&api_key, &self.config) {
            Ok(rows) => {
                if rows.is_empty() {
                    self.log("[WARN] API returned no upcoming fixtures");
                } else {
                    self.log(format!("[INFO] Loaded {} upcoming fixtures", rows.len()));
                }
                let _ = self.tx.send(Delta::SetFixtures(rows));
            }
            Err(err) => {
                self.log(format!("[WARN] Fixtures fetch error: {err:#}"));
                self.log("[INFO] Check the API key and quota, then press r to retry");
            }
        }
        self.last_fixture_fetch = Some(Instant::now());
    }

    fn predict(&mut self, fixture: FixtureRow) {
        let Some(api_key) = self.api_key.clone() else {
            self.log("[WARN] Prediction requested before an API key was set");
            return;
        };
        let Some(models) = &self.models else {
            self.log("[WARN] Models are not fitted yet");
            return;
        };

        self.busy(Some(format!(
            "Fetching statistics for {} vs {}",
            fixture.home, fixture.away
        )));
        match build_feature_vector(&api_key, &self.config, &fixture) {
            Ok(features) => {
                let prediction = models.predict(&features);
                self.log(format!(
                    "[INFO] Prediction ready: {} {}-{} {}",
                    fixture.home, prediction.home_goals, prediction.away_goals, fixture.away
                ));
                let _ = self.tx.send(Delta::SetPrediction {
                    fixture_id: fixture.id,
                    prediction,
                });
            }
            Err(err) => {
                self.log(format!("[WARN] Team statistics error: {err:#}"));
            }
        }
        self.busy(None);
    }

    fn busy(&self, message: Option<String>) {
        let _ = self.tx.send(Delta::Busy(message));
    }

    fn log(&self, line: impl Into<String>) {
        let _ = self.tx.send(Delta::Log(line.into()));
    }
}

fn build_feature_vector(
    api_key: &str,
    config: &AppConfig,
    fixture: &FixtureRow,
) -> Result<FeatureVector> {
    let home = team_stats_fetch::fetch_team_stats(api_key, config, fixture.home_id)?;
    let away = team_stats_fetch::fetch_team_stats(api_key, config, fixture.away_id)?;
    Ok(FeatureVector::from_sides(&home, &away))
}
