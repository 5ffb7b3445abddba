use std::collections::{HashMap, VecDeque};

use crate::fixtures_fetch::FixtureRow;
use crate::model::MatchPrediction;

const LOG_CAP: usize = 200;

pub const DEFAULT_HOME_ODDS: f64 = 1.9;
pub const DEFAULT_DRAW_ODDS: f64 = 3.2;
pub const DEFAULT_AWAY_ODDS: f64 = 4.0;

const ODDS_STEP: f64 = 0.05;
const ODDS_MIN: f64 = 1.0;
const ODDS_MAX: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    ApiKey,
    Fixtures,
    Prediction { fixture_id: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OddsField {
    Home,
    Draw,
    Away,
}

/// User-supplied decimal odds for the EV widget.
#[derive(Debug, Clone, PartialEq)]
pub struct OddsInput {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl Default for OddsInput {
    fn default() -> Self {
        Self {
            home: DEFAULT_HOME_ODDS,
            draw: DEFAULT_DRAW_ODDS,
            away: DEFAULT_AWAY_ODDS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub screen: Screen,
    pub key_input: String,
    pub fixtures: Vec<FixtureRow>,
    pub selected: usize,
    pub predictions: HashMap<u64, MatchPrediction>,
    /// Fixture id we asked the provider to predict; the screen flips to
    /// Prediction when its result lands.
    pub prediction_pending: Option<u64>,
    pub odds: OddsInput,
    pub odds_field: OddsField,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
    pub model_ready: bool,
    pub training_samples: usize,
    pub busy: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            screen: Screen::ApiKey,
            key_input: String::new(),
            fixtures: Vec::with_capacity(16),
            selected: 0,
            predictions: HashMap::with_capacity(16),
            prediction_pending: None,
            odds: OddsInput::default(),
            odds_field: OddsField::Home,
            logs: VecDeque::with_capacity(LOG_CAP),
            help_overlay: false,
            model_ready: false,
            training_samples: 0,
            busy: None,
        }
    }

    pub fn push_log(&mut self, line: impl Into<String>) {
        if self.logs.len() >= LOG_CAP {
            self.logs.pop_front();
        }
        self.logs.push_back(line.into());
    }

    pub fn selected_fixture(&self) -> Option<&FixtureRow> {
        self.fixtures.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if !self.fixtures.is_empty() {
            self.selected = (self.selected + 1).min(self.fixtures.len() - 1);
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn cycle_odds_field(&mut self) {
        self.odds_field = match self.odds_field {
            OddsField::Home => OddsField::Draw,
            OddsField::Draw => OddsField::Away,
            OddsField::Away => OddsField::Home,
        };
    }

    pub fn adjust_selected_odds(&mut self, steps: i32) {
        let slot = match self.odds_field {
            OddsField::Home => &mut self.odds.home,
            OddsField::Draw => &mut self.odds.draw,
            OddsField::Away => &mut self.odds.away,
        };
        *slot = (*slot + ODDS_STEP * f64::from(steps)).clamp(ODDS_MIN, ODDS_MAX);
        // Keep the stored value on the 0.05 grid despite float drift.
        *slot = (*slot / ODDS_STEP).round() * ODDS_STEP;
    }

    pub fn current_prediction(&self) -> Option<&MatchPrediction> {
        match &self.screen {
            Screen::Prediction { fixture_id } => self.predictions.get(fixture_id),
            _ => self
                .selected_fixture()
                .and_then(|f| self.predictions.get(&f.id)),
        }
    }

    pub fn prediction_fixture(&self) -> Option<&FixtureRow> {
        match &self.screen {
            Screen::Prediction { fixture_id } => {
                self.fixtures.iter().find(|f| f.id == *fixture_id)
            }
            _ => self.selected_fixture(),
        }
    }
}

/// Everything the provider thread can report back to the UI.
#[derive(Debug, Clone)]
pub enum Delta {
    ModelsReady { samples: usize },
    SetFixtures(Vec<FixtureRow>),
    SetPrediction {
        fixture_id: u64,
        prediction: MatchPrediction,
    },
    Busy(Option<String>),
    Log(String),
}

#[derive(Debug, Clone)]
pub enum ProviderCommand {
    Start { api_key: String },
    FetchFixtures,
    Predict { fixture: FixtureRow },
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::ModelsReady { samples } => {
            state.model_ready = true;
            state.training_samples = samples;
        }
        Delta::SetFixtures(fixtures) => {
            // Keep the highlighted fixture stable across refreshes.
            let selected_id = state.selected_fixture().map(|f| f.id);
            state.fixtures = fixtures;
            state.selected = selected_id
                .and_then(|id| state.fixtures.iter().position(|f| f.id == id))
                .unwrap_or(0);
            if state.screen == Screen::ApiKey {
                return;
            }
            state.screen = match state.screen.clone() {
                Screen::Prediction { fixture_id }
                    if state.fixtures.iter().any(|f| f.id == fixture_id) =>
                {
                    Screen::Prediction { fixture_id }
                }
                _ => Screen::Fixtures,
            };
        }
        Delta::SetPrediction {
            fixture_id,
            prediction,
        } => {
            state.predictions.insert(fixture_id, prediction);
            if state.prediction_pending == Some(fixture_id) {
                state.prediction_pending = None;
                state.screen = Screen::Prediction { fixture_id };
            }
        }
        Delta::Busy(message) => {
            state.busy = message;
        }
        Delta::Log(line) => {
            state.push_log(line);
        }
    }
}
