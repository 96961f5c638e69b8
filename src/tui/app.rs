//! Main TUI application state machine.
//!
//! Handles:
//! - Input event handling
//! - Form editing
//! - Synchronous risk computation on submit

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::adapters::{HttpArtifactSource, RandomSurvivalForest};
use crate::application::{load_artifacts, ArtifactFetcher, RiskService};
use crate::config::AppConfig;
use crate::ports::SurvivalModel;

use super::ui::{
    form::FormState,
    render_page,
    result::ResultState,
};

/// Main application state
pub struct App<M: SurvivalModel = RandomSurvivalForest> {
    /// Whether the app should quit
    should_quit: bool,

    /// Risk service holding the loaded artifacts
    risk_service: RiskService<M>,

    /// Form state
    form_state: FormState,

    /// Result panel state
    result_state: ResultState,
}

impl App<RandomSurvivalForest> {
    /// Create a new application: fetch missing artifacts, then load them.
    ///
    /// # Errors
    /// Returns error if an artifact cannot be fetched, read or validated.
    /// The TUI never starts in that case.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let source = HttpArtifactSource::new()?;
        let fetcher = ArtifactFetcher::new(source, &config.cache_dir);

        let paths = fetcher
            .ensure_all(config)
            .map_err(|e| anyhow!("Failed to fetch model artifacts: {}", e))?;
        let loaded = load_artifacts(&paths)
            .map_err(|e| anyhow!("Failed to load model artifacts: {}", e))?;

        let risk_service = RiskService::new(Arc::new(loaded.model), Arc::new(loaded.schema));
        Ok(Self::with_dependencies(risk_service))
    }
}

impl<M: SurvivalModel> App<M> {
    /// Create application with an injected risk service.
    pub fn with_dependencies(risk_service: RiskService<M>) -> Self {
        Self {
            should_quit: false,
            risk_service,
            form_state: FormState::default(),
            result_state: ResultState::default(),
        }
    }

    /// Run the main application loop.
    ///
    /// # Errors
    /// Returns error if terminal operations fail.
    pub fn run(&mut self) -> Result<()> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.main_loop(&mut terminal);

        // Restore terminal
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| {
                render_page(f, f.area(), &self.form_state, &self.result_state);
            })?;

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code, key.modifiers);
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    /// Apply one key press.
    pub fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        if key == KeyCode::Char('q') && modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        let edited = match key {
            KeyCode::Esc => {
                self.should_quit = true;
                false
            }
            KeyCode::Up | KeyCode::BackTab => {
                self.form_state.prev_field();
                false
            }
            KeyCode::Down | KeyCode::Tab => {
                self.form_state.next_field();
                false
            }
            KeyCode::Left => self.form_state.cycle_option(false),
            KeyCode::Right => self.form_state.cycle_option(true),
            KeyCode::Char(c) => self.form_state.input_char(c),
            KeyCode::Backspace => self.form_state.delete_char(),
            KeyCode::Delete => self.form_state.clear_field(),
            KeyCode::Enter => {
                self.compute_risk();
                false
            }
            _ => false,
        };

        // A shown result belongs to the values it was computed from.
        if edited {
            self.result_state = ResultState::Idle;
        }
    }

    fn compute_risk(&mut self) {
        let record = match self.form_state.to_input_record() {
            Ok(record) => record,
            Err(e) => {
                self.form_state.error_message = Some(e.to_string());
                self.result_state = ResultState::Idle;
                return;
            }
        };
        self.form_state.error_message = None;

        self.result_state = match self.risk_service.assess(&record) {
            Ok(assessment) => ResultState::Shown { assessment },
            Err(e) => {
                tracing::warn!("Risk computation failed: {}", e);
                ResultState::Error {
                    message: e.to_string(),
                }
            }
        };
    }

    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    #[must_use]
    pub fn form_state(&self) -> &FormState {
        &self.form_state
    }

    #[must_use]
    pub fn result_state(&self) -> &ResultState {
        &self.result_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{variables::form_columns, FeatureSchema, ModelInput, SurvivalCurve};
    use crate::ports::ModelError;

    /// Model whose survival at five years drops by 0.01 per year of age over 45.
    struct AgeModel {
        n_features: usize,
    }

    impl SurvivalModel for AgeModel {
        fn n_features(&self) -> usize {
            self.n_features
        }

        fn predict_survival_function(
            &self,
            input: &ModelInput,
        ) -> Result<SurvivalCurve, ModelError> {
            if input.len() != self.n_features {
                return Err(ModelError::ShapeMismatch {
                    expected: self.n_features,
                    actual: input.len(),
                });
            }
            let age = input.get("Age").unwrap_or(45.0);
            let at_five = (0.92 - (age - 45.0) * 0.01).clamp(0.0, 1.0);
            Ok(SurvivalCurve::new(vec![1.0, 5.0, 10.0], vec![0.99, at_five, at_five * 0.9])?)
        }
    }

    fn app_with(n_features: usize) -> App<AgeModel> {
        let schema = Arc::new(FeatureSchema::new(form_columns()).expect("schema"));
        let model = Arc::new(AgeModel { n_features });
        App::with_dependencies(RiskService::new(model, schema))
    }

    fn shown_label(app: &App<AgeModel>) -> Option<String> {
        match app.result_state() {
            ResultState::Shown { assessment } => Some(assessment.estimate.percent_label()),
            _ => None,
        }
    }

    #[test]
    fn test_enter_computes_risk_for_defaults() {
        let mut app = app_with(29);
        assert!(matches!(app.result_state(), ResultState::Idle));

        app.handle_key(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(shown_label(&app).as_deref(), Some("8.00%"));
    }

    #[test]
    fn test_editing_hides_stale_result_and_recompute_uses_new_values() {
        let mut app = app_with(29);
        app.handle_key(KeyCode::Enter, KeyModifiers::NONE);
        assert!(shown_label(&app).is_some());

        // Age is the first field: 45 -> 4 -> 47
        app.handle_key(KeyCode::Backspace, KeyModifiers::NONE);
        assert!(matches!(app.result_state(), ResultState::Idle));
        app.handle_key(KeyCode::Char('7'), KeyModifiers::NONE);

        app.handle_key(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(shown_label(&app).as_deref(), Some("10.00%"));
    }

    #[test]
    fn test_navigation_keeps_result() {
        let mut app = app_with(29);
        app.handle_key(KeyCode::Enter, KeyModifiers::NONE);
        app.handle_key(KeyCode::Down, KeyModifiers::NONE);
        app.handle_key(KeyCode::BackTab, KeyModifiers::NONE);
        assert!(shown_label(&app).is_some());
    }

    #[test]
    fn test_model_failure_is_shown_and_app_survives() {
        let mut app = app_with(3);
        app.handle_key(KeyCode::Enter, KeyModifiers::NONE);
        match app.result_state() {
            ResultState::Error { message } => assert!(message.contains("expects 3 features")),
            other => panic!("expected error state, got {other:?}"),
        }
        assert!(!app.should_quit());
    }

    #[test]
    fn test_invalid_entry_blocks_submission() {
        let mut app = app_with(29);
        app.handle_key(KeyCode::Delete, KeyModifiers::NONE);
        app.handle_key(KeyCode::Enter, KeyModifiers::NONE);

        assert!(matches!(app.result_state(), ResultState::Idle));
        assert!(app.form_state().error_message.is_some());
    }

    #[test]
    fn test_quit_keys() {
        let mut app = app_with(29);
        app.handle_key(KeyCode::Char('q'), KeyModifiers::CONTROL);
        assert!(app.should_quit());

        let mut app = app_with(29);
        app.handle_key(KeyCode::Esc, KeyModifiers::NONE);
        assert!(app.should_quit());
    }
}
