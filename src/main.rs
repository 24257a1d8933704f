mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    io::{self, stdin, Write},
    path::PathBuf,
    sync::Arc,
};
use tracing::{debug, warn};
use typespeed::{
    app_dirs::AppDirs,
    clock::SystemClock,
    config::{Config, ConfigStore, FileConfigStore},
    context::{AppContext, Theme},
    error::PresentationError,
    history::CsvHistoryStore,
    language::{Difficulty, SentenceGenerator},
    logging::init_logging,
    report::{self, SpeedPoint},
    runtime::{AppEvent, CrosstermEventSource, EventSource, FixedTicker, Runner, Ticker},
    session::{Phase, Session, Submission},
    sound::{AlertPlayer, Sound, SoundKind, TerminalBell},
};

/// typing speed tester with per-user history, charts and reports
#[derive(Parser, Debug, Clone, Default)]
#[clap(
    version,
    about,
    long_about = "Measure typing speed and accuracy against randomly generated sentences. Results are kept per user and can be charted or exported as a report."
)]
pub struct Cli {
    /// log in as this user on launch
    #[clap(short = 'u', long)]
    user: Option<String>,

    /// prompt length: easy (20 words), medium (40) or hard (60)
    #[clap(short = 'd', long, value_enum)]
    difficulty: Option<Difficulty>,

    /// color theme
    #[clap(long, value_enum)]
    theme: Option<Theme>,

    /// how countdown alerts are played
    #[clap(long, value_enum)]
    sound: Option<SoundKind>,

    /// disable countdown alerts for this run
    #[clap(long)]
    no_sound: bool,

    /// directory holding per-user score files
    #[clap(long)]
    history_dir: Option<PathBuf>,

    /// directory exported reports are written to
    #[clap(long, default_value = ".")]
    report_dir: PathBuf,

    /// seed for reproducible prompts
    #[clap(long)]
    seed: Option<u64>,

    /// number of recent trials shown in the speed chart
    #[clap(long)]
    chart_points: Option<usize>,
}

impl Cli {
    /// Flags override the stored configuration for this run only
    fn apply(&self, config: &mut Config) {
        if let Some(difficulty) = self.difficulty {
            config.difficulty = difficulty;
        }
        if let Some(theme) = self.theme {
            config.theme = theme;
        }
        if let Some(sound) = self.sound {
            config.sound = sound;
        }
        if self.no_sound {
            config.sound_enabled = false;
        }
        if let Some(ref dir) = self.history_dir {
            config.history_dir = Some(dir.clone());
        }
        if let Some(n) = self.chart_points {
            config.chart_points = n.max(1);
        }
    }

    fn generator(&self) -> SentenceGenerator {
        match self.seed {
            Some(seed) => SentenceGenerator::seeded(seed),
            None => SentenceGenerator::from_entropy(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Main,
    Chart,
    About,
    ConfirmLogout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Warning,
}

/// Dismissible popup shown over the current screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Continue,
    Quit,
}

#[derive(Debug)]
pub struct App {
    pub session: Session,
    pub context: AppContext,
    pub config: Config,
    pub difficulty: Difficulty,
    pub screen: Screen,
    pub username_input: String,
    pub login_error: Option<String>,
    pub message: Option<Message>,
    pub chart: Vec<SpeedPoint>,
    pub report_dir: PathBuf,
    alerts: AlertPlayer,
    bell: Option<TerminalBell>,
    /// the store and the config as it is on disk, without this run's flags
    config_store: Option<(FileConfigStore, Config)>,
}

impl App {
    pub fn new(config: Config, session: Session, sound: Arc<dyn Sound>, report_dir: PathBuf) -> Self {
        Self {
            session,
            context: config.context(),
            difficulty: config.difficulty,
            config,
            screen: Screen::Login,
            username_input: String::new(),
            login_error: None,
            message: None,
            chart: Vec::new(),
            report_dir,
            alerts: AlertPlayer::new(sound),
            bell: None,
            config_store: None,
        }
    }

    /// Toggles are saved into the config loaded from `store`, never into the
    /// flag-adjusted config of this run
    pub fn with_config_store(mut self, store: FileConfigStore) -> Self {
        let stored = store.load();
        self.config_store = Some((store, stored));
        self
    }

    pub fn with_bell(mut self, bell: TerminalBell) -> Self {
        self.bell = Some(bell);
        self
    }

    /// Write queued bell rings; called by the loop between frames
    pub fn ring_bell<W: Write>(&self, out: &mut W) {
        if let Some(ref bell) = self.bell {
            if let Err(e) = bell.ring_pending(out) {
                warn!(error = %e, "terminal bell failed");
            }
        }
    }

    fn info(&mut self, text: impl Into<String>) {
        self.message = Some(Message {
            kind: MessageKind::Info,
            text: text.into(),
        });
    }

    fn warn(&mut self, text: impl Into<String>) {
        self.message = Some(Message {
            kind: MessageKind::Warning,
            text: text.into(),
        });
    }

    pub fn login(&mut self, name: &str) {
        match self.session.login(name) {
            Ok(()) => {
                self.username_input.clear();
                self.login_error = None;
                self.screen = Screen::Main;
            }
            Err(e) => self.login_error = Some(e.to_string()),
        }
    }

    pub fn logout(&mut self) {
        self.session.logout();
        self.chart.clear();
        self.screen = Screen::Login;
    }

    pub fn start_trial(&mut self) {
        if let Err(e) = self.session.start(self.difficulty) {
            debug!(error = %e, "start ignored");
        }
    }

    pub fn submit(&mut self) {
        if let Some(submission) = self.session.submit() {
            self.on_submission(submission);
        }
    }

    fn on_submission(&mut self, submission: Submission) {
        if let Some(e) = submission.storage_error {
            self.warn(format!("Failed to save score: {e}"));
        }
    }

    pub fn on_tick(&mut self) {
        let report = self.session.tick();
        if self.context.sound_enabled {
            for _ in 0..report.alerts() {
                self.alerts.alert();
            }
        }
        if let Some(submission) = report.submission {
            self.on_submission(submission);
        }
    }

    pub fn on_paste(&mut self, text: &str) {
        match self.screen {
            Screen::Login if self.message.is_none() => {
                self.username_input.push_str(text.trim_end_matches(['\r', '\n']))
            }
            Screen::Main if self.message.is_none() => {
                if let Some(typed) = self.session.trial().map(|t| format!("{}{text}", t.typed)) {
                    self.session.set_typed(&typed);
                }
            }
            _ => {}
        }
    }

    pub fn show_chart(&mut self) {
        let Some(user) = self.session.user().map(str::to_string) else {
            return;
        };
        let points = self
            .session
            .history()
            .map_err(PresentationError::from)
            .and_then(|history| report::chart_points(&user, &history, self.config.chart_points));
        match points {
            Ok(points) => {
                self.chart = points;
                self.screen = Screen::Chart;
            }
            Err(e) => self.warn(format!("Cannot read score data.\n{e}")),
        }
    }

    pub fn export_report(&mut self) {
        let Some(user) = self.session.user().map(str::to_string) else {
            return;
        };
        let exported = self
            .session
            .history()
            .map_err(PresentationError::from)
            .and_then(|history| report::export_report(&self.report_dir, &user, &history));
        match exported {
            Ok(path) => self.info(format!("Report saved as {}", path.display())),
            Err(e) => self.warn(format!("No data to export or failed to read data.\n{e}")),
        }
    }

    fn persist(&mut self, update: impl Fn(&mut Config)) {
        update(&mut self.config);
        if let Some((ref store, ref mut stored)) = self.config_store {
            update(stored);
            if let Err(e) = store.save(stored) {
                warn!(error = %e, "could not save config");
            }
        }
    }

    pub fn toggle_theme(&mut self) {
        let theme = self.context.toggle_theme();
        self.persist(|cfg| cfg.theme = theme);
    }

    pub fn toggle_sound(&mut self) {
        let enabled = self.context.toggle_sound();
        self.persist(|cfg| cfg.sound_enabled = enabled);
        self.info(format!(
            "Sound effects {}.",
            if enabled { "enabled" } else { "disabled" }
        ));
    }

    pub fn on_key(&mut self, key: KeyEvent) -> Action {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Action::Quit;
        }

        if self.message.is_some() {
            self.message = None;
            return Action::Continue;
        }

        match self.screen {
            Screen::Login => match key.code {
                KeyCode::Esc => return Action::Quit,
                KeyCode::Enter => {
                    let name = self.username_input.clone();
                    self.login(&name);
                }
                KeyCode::Backspace => {
                    self.username_input.pop();
                }
                KeyCode::Char(c) => self.username_input.push(c),
                _ => {}
            },
            Screen::Main if self.session.phase() == Phase::Running => match key.code {
                KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    self.screen = Screen::ConfirmLogout
                }
                KeyCode::Enter | KeyCode::Tab => self.submit(),
                KeyCode::Backspace => self.session.backspace(),
                KeyCode::Char(c) => self.session.type_char(c),
                _ => {}
            },
            Screen::Main => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Action::Quit,
                KeyCode::Char('s') | KeyCode::Enter => self.start_trial(),
                KeyCode::Char('d') => self.difficulty = self.difficulty.next(),
                KeyCode::Char('g') => self.show_chart(),
                KeyCode::Char('e') => self.export_report(),
                KeyCode::Char('t') => self.toggle_theme(),
                KeyCode::Char('m') => self.toggle_sound(),
                KeyCode::Char('a') => self.screen = Screen::About,
                KeyCode::Char('l') => self.screen = Screen::ConfirmLogout,
                _ => {}
            },
            Screen::Chart | Screen::About => self.screen = Screen::Main,
            Screen::ConfirmLogout => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => self.logout(),
                _ => self.screen = Screen::Main,
            },
        }
        Action::Continue
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let _log_guard = init_logging(&AppDirs::log_dir());

    let config_store = FileConfigStore::new();
    let mut config = config_store.load();
    cli.apply(&mut config);

    let store = CsvHistoryStore::new(config.history_dir());
    debug!(dir = %store.dir().display(), "history store");
    let session = Session::new(cli.generator(), SystemClock::new(), store);
    let bell = TerminalBell::new();
    let sound = config.sound.backend(&bell);

    let mut app = App::new(config, session, sound, cli.report_dir.clone())
        .with_config_store(config_store)
        .with_bell(bell);
    if let Some(ref user) = cli.user {
        app.login(user);
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let runner = Runner::new(CrosstermEventSource::new(), FixedTicker::default());
    let result = run_app(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app<B: Backend, E: EventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    loop {
        terminal.draw(|f| ui(app, f))?;
        app.ring_bell(&mut io::stdout());

        let action = match runner.step() {
            AppEvent::Tick => {
                app.on_tick();
                Action::Continue
            }
            AppEvent::Resize => Action::Continue,
            AppEvent::Paste(text) => {
                app.on_paste(&text);
                Action::Continue
            }
            AppEvent::Key(key) => app.on_key(key),
        };

        if action == Action::Quit {
            return Ok(());
        }
    }
}

fn ui(app: &App, f: &mut Frame) {
    f.render_widget(app, f.area());
}
