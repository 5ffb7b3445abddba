use std::io;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Clear, Paragraph};

use matchsight::config::{self, AppConfig};
use matchsight::ev::format_ev;
use matchsight::model::MatchPrediction;
use matchsight::provider::spawn_provider;
use matchsight::state::{AppState, Delta, OddsField, ProviderCommand, Screen, apply_delta};

struct App {
    state: AppState,
    config: AppConfig,
    cmd_tx: mpsc::Sender<ProviderCommand>,
    should_quit: bool,
}

impl App {
    fn new(cmd_tx: mpsc::Sender<ProviderCommand>, config: AppConfig) -> Self {
        let mut state = AppState::new();
        if let Some(key) = config::env_api_key() {
            state.key_input = key;
            state.push_log("[INFO] API key pre-filled from APIFOOTBALL_KEY");
        }
        Self {
            state,
            config,
            cmd_tx,
            should_quit: false,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match self.state.screen {
            Screen::ApiKey => self.on_key_api_key(key),
            Screen::Fixtures => self.on_key_fixtures(key),
            Screen::Prediction { .. } => self.on_key_prediction(key),
        }
    }

    fn on_key_api_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.submit_api_key(),
            KeyCode::Backspace => {
                self.state.key_input.pop();
            }
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Char(ch) if !ch.is_control() => self.state.key_input.push(ch),
            _ => {}
        }
    }

    fn on_key_fixtures(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Char('r') => self.request_fixtures(),
            KeyCode::Enter | KeyCode::Char('p') => self.request_prediction(),
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            _ => {}
        }
    }

    fn on_key_prediction(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('b') | KeyCode::Esc => {
                self.state.screen = Screen::Fixtures;
            }
            KeyCode::Tab | KeyCode::Char('l') | KeyCode::Right => self.state.cycle_odds_field(),
            KeyCode::Char('h') | KeyCode::Left => {
                // Two forward steps of a three-way cycle is one step back.
                self.state.cycle_odds_field();
                self.state.cycle_odds_field();
            }
            KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Up => {
                self.state.adjust_selected_odds(1)
            }
            KeyCode::Char('-') | KeyCode::Down => self.state.adjust_selected_odds(-1),
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            _ => {}
        }
    }

    fn submit_api_key(&mut self) {
        let key = self.state.key_input.trim().to_string();
        if key.is_empty() {
            self.state.push_log("[WARN] API key is empty");
            return;
        }
        if self
            .cmd_tx
            .send(ProviderCommand::Start { api_key: key })
            .is_err()
        {
            self.state.push_log("[ERROR] Provider thread is gone");
            return;
        }
        self.state.screen = Screen::Fixtures;
        self.state.push_log("[INFO] API key set, starting up");
    }

    fn request_fixtures(&mut self) {
        if self.cmd_tx.send(ProviderCommand::FetchFixtures).is_err() {
            self.state.push_log("[ERROR] Provider thread is gone");
        } else {
            self.state.push_log("[INFO] Fixture refresh requested");
        }
    }

    fn request_prediction(&mut self) {
        let Some(fixture) = self.state.selected_fixture().cloned() else {
            self.state.push_log("[INFO] No fixture selected");
            return;
        };
        if self.state.predictions.contains_key(&fixture.id) {
            self.state.screen = Screen::Prediction {
                fixture_id: fixture.id,
            };
            return;
        }
        if !self.state.model_ready {
            self.state.push_log("[WARN] Models are still training");
            return;
        }
        if self
            .cmd_tx
            .send(ProviderCommand::Predict {
                fixture: fixture.clone(),
            })
            .is_err()
        {
            self.state.push_log("[ERROR] Provider thread is gone");
            return;
        }
        self.state.prediction_pending = Some(fixture.id);
        self.state
            .push_log(format!("[INFO] Predicting {}", fixture.label()));
    }
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    let config = AppConfig::from_env();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    spawn_provider(tx, cmd_rx, config.clone());

    let mut app = App::new(cmd_tx, config);
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(4),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header =
        Paragraph::new(header_text(app)).block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    match app.state.screen {
        Screen::ApiKey => render_api_key(frame, chunks[1], &app.state),
        Screen::Fixtures => render_fixtures(frame, chunks[1], &app.state),
        Screen::Prediction { .. } => render_prediction(frame, chunks[1], &app.state),
    }

    let console = Paragraph::new(console_text(&app.state))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, chunks[2]);

    let footer = Paragraph::new(footer_text(&app.state)).style(Style::default().fg(Color::Gray));
    frame.render_widget(footer, chunks[3]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(app: &App) -> String {
    let screen = match app.state.screen {
        Screen::ApiKey => "KEY",
        Screen::Fixtures => "FIXTURES",
        Screen::Prediction { .. } => "PREDICTION",
    };
    let model = if app.state.model_ready {
        format!("model ready ({} matches)", app.state.training_samples)
    } else {
        "model not fitted".to_string()
    };
    let status = app
        .state
        .busy
        .as_deref()
        .map(|msg| format!("... {msg}"))
        .unwrap_or_default();
    format!(
        "MATCHSIGHT | {screen} | League {} Season {} | {model}\n{status}",
        app.config.league_id, app.config.season
    )
}

fn footer_text(state: &AppState) -> String {
    match state.screen {
        Screen::ApiKey => "Type key | Enter Submit | Esc Quit".to_string(),
        Screen::Fixtures => {
            "j/k/Up/Down Move | Enter Predict | r Refresh | ? Help | q Quit".to_string()
        }
        Screen::Prediction { .. } => {
            "Tab/h/l Odds field | +/- Adjust | b/Esc Back | ? Help | q Quit".to_string()
        }
    }
}

fn render_api_key(frame: &mut Frame, area: Rect, state: &AppState) {
    let popup = centered_rect(60, 40, area);
    let masked = "*".repeat(state.key_input.chars().count());
    let text = format!(
        "Enter your API-Football key\n\n> {masked}\n\nThe key is sent only as the x-apisports-key header.\nSet APIFOOTBALL_KEY in .env to skip this prompt."
    );
    let widget = Paragraph::new(text)
        .block(Block::default().title("API Key").borders(Borders::ALL));
    frame.render_widget(widget, popup);
}

fn render_fixtures(frame: &mut Frame, area: Rect, state: &AppState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(area);

    let widths = fixture_columns();
    render_fixtures_header(frame, sections[0], &widths);

    let list_area = sections[1];
    if state.fixtures.is_empty() {
        let hint = if state.model_ready {
            "No fixtures loaded. Press r to fetch."
        } else {
            "Waiting for training and fixtures..."
        };
        let empty = Paragraph::new(hint).style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, list_area);
        return;
    }

    if list_area.height == 0 {
        return;
    }
    let visible = list_area.height as usize;
    let (start, end) = visible_range(state.selected, state.fixtures.len(), visible);

    for (i, idx) in (start..end).enumerate() {
        let row_area = Rect {
            x: list_area.x,
            y: list_area.y + i as u16,
            width: list_area.width,
            height: 1,
        };

        let selected = idx == state.selected;
        let row_style = if selected {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else {
            Style::default()
        };
        if selected {
            frame.render_widget(Block::default().style(row_style), row_area);
        }

        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(widths)
            .split(row_area);

        let fixture = &state.fixtures[idx];
        let predicted = if state.predictions.contains_key(&fixture.id) {
            "*"
        } else {
            " "
        };
        render_cell_text(frame, cols[0], &fixture.kickoff_label, row_style);
        render_cell_text(
            frame,
            cols[1],
            &format!("{} vs {}", fixture.home, fixture.away),
            row_style,
        );
        render_cell_text(frame, cols[2], &fixture.league_name, row_style);
        render_cell_text(frame, cols[3], &fixture.round, row_style);
        render_cell_text(frame, cols[4], predicted, row_style);
    }
}

fn fixture_columns() -> [Constraint; 5] {
    [
        Constraint::Length(12),
        Constraint::Min(28),
        Constraint::Length(16),
        Constraint::Length(20),
        Constraint::Length(2),
    ]
}

fn render_fixtures_header(frame: &mut Frame, area: Rect, widths: &[Constraint]) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(widths)
        .split(area);
    let style = Style::default().add_modifier(Modifier::BOLD);

    render_cell_text(frame, cols[0], "Kickoff", style);
    render_cell_text(frame, cols[1], "Match", style);
    render_cell_text(frame, cols[2], "League", style);
    render_cell_text(frame, cols[3], "Round", style);
    render_cell_text(frame, cols[4], "P", style);
}

fn render_prediction(frame: &mut Frame, area: Rect, state: &AppState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(36), Constraint::Length(34)])
        .split(area);

    render_prediction_panel(frame, columns[0], state);
    render_odds_panel(frame, columns[1], state);
}

fn render_prediction_panel(frame: &mut Frame, area: Rect, state: &AppState) {
    let title = state
        .prediction_fixture()
        .map(|f| format!("{} vs {}", f.home, f.away))
        .unwrap_or_else(|| "Prediction".to_string());
    let block = Block::default().title(title).borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(prediction) = state.current_prediction() else {
        let empty = Paragraph::new("No prediction yet");
        frame.render_widget(empty, inner);
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(inner);

    frame.render_widget(outcome_bar_chart(prediction), rows[0]);

    let text = format!(
        "Home win: {:>5.1}%\nDraw:     {:>5.1}%\nAway win: {:>5.1}%\n\nLikely scoreline: {} - {}\nTrained on {} matches",
        prediction.p_home,
        prediction.p_draw,
        prediction.p_away,
        prediction.home_goals,
        prediction.away_goals,
        state.training_samples
    );
    frame.render_widget(Paragraph::new(text), rows[1]);
}

fn render_odds_panel(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default().title("Odds & EV").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(prediction) = state.current_prediction() else {
        frame.render_widget(Paragraph::new("No prediction yet"), inner);
        return;
    };

    let rows = [
        (OddsField::Home, "Home", state.odds.home, prediction.p_home),
        (OddsField::Draw, "Draw", state.odds.draw, prediction.p_draw),
        (OddsField::Away, "Away", state.odds.away, prediction.p_away),
    ];

    let mut lines = Vec::new();
    for (field, label, odds, prob) in rows {
        let marker = if state.odds_field == field { ">" } else { " " };
        lines.push(format!(
            "{marker} {label:<4} odds {odds:>5.2}  EV {}",
            format_ev(prob, odds)
        ));
    }
    lines.push(String::new());
    lines.push("EV = prob x odds - 1".to_string());
    frame.render_widget(Paragraph::new(lines.join("\n")), inner);
}

fn outcome_bar_chart(prediction: &MatchPrediction) -> BarChart<'static> {
    let home = Bar::default()
        .value(prediction.p_home.round() as u64)
        .text_value(String::new())
        .style(Style::default().fg(Color::Green));
    let draw = Bar::default()
        .value(prediction.p_draw.round() as u64)
        .text_value(String::new())
        .style(Style::default().fg(Color::Yellow));
    let away = Bar::default()
        .value(prediction.p_away.round() as u64)
        .text_value(String::new())
        .style(Style::default().fg(Color::Red));

    BarChart::default()
        .data(BarGroup::default().bars(&[home, draw, away]))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .group_gap(0)
        .max(100)
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No messages yet".to_string();
    }
    state
        .logs
        .iter()
        .rev()
        .take(2)
        .cloned()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n")
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total == 0 || visible == 0 {
        return (0, 0);
    }
    if total <= visible {
        return (0, total);
    }

    let mut start = selected.saturating_sub(visible / 2);
    if start + visible > total {
        start = total - visible;
    }
    (start, start + visible)
}

fn render_cell_text(frame: &mut Frame, area: Rect, text: &str, style: Style) {
    let paragraph = Paragraph::new(text).style(style);
    frame.render_widget(paragraph, area);
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Matchsight - Help",
        "",
        "Fixtures:",
        "  j/k or Up/Down   Move",
        "  Enter / p        Predict selected fixture",
        "  r                Refresh fixtures",
        "",
        "Prediction:",
        "  Tab / h / l      Cycle odds field",
        "  + / -            Adjust odds by 0.05",
        "  b / Esc          Back to fixtures",
        "",
        "Global:",
        "  ?                Toggle help",
        "  q                Quit",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
