mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::Size,
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin, Write},
    time::{Duration, SystemTime},
};

use tippwerk::celebration::Celebration;
use tippwerk::config::{Config, ConfigStore, FileConfigStore};
use tippwerk::corpus::{self, Difficulty};
use tippwerk::feedback::{Cue, FeedbackSink, NullSink};
use tippwerk::generator::{Finger, PracticeMode};
use tippwerk::practice::{DisplayMode, PracticeOutcome, PracticeSession};
use tippwerk::progress::{Badge, FileProgressStore, Progress, ProgressStore};
use tippwerk::round::{Key, KeyOutcome, RoundStatus, TypingRound};
use tippwerk::runtime::{AppEvent, CrosstermEventSource, EventSource, Runner};
use tippwerk::TICK_RATE_MS;

/// minecraft-flavored german typing trainer for the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A German QWERTZ typing trainer: timed rounds against curated texts, \
open-ended character drills with frequency-weighted targets, local highscores and badges."
)]
pub struct Cli {
    /// difficulty of the round texts
    #[clap(short, long, value_enum, default_value_t = Difficulty::Beginner)]
    difficulty: Difficulty,

    /// custom target text; starts a round immediately
    #[clap(short, long)]
    text: Option<String>,

    /// jump straight into practice mode
    #[clap(short, long)]
    practice: bool,

    /// alphabet for practice mode
    #[clap(short, long, value_enum)]
    mode: Option<PracticeMode>,

    /// how practice targets are presented
    #[clap(long, value_enum)]
    display: Option<DisplayMode>,

    /// characters per run in sequence display mode
    #[clap(long)]
    sequence_length: Option<usize>,

    /// milliseconds between targets in rhythm display mode
    #[clap(long)]
    rhythm_interval_ms: Option<u64>,

    /// drill a single finger's QWERTZ keys instead of the full alphabet
    #[clap(long, value_enum)]
    drill: Option<Finger>,

    /// disable the terminal bell on errors
    #[clap(long)]
    no_sound: bool,

    /// disable particle effects
    #[clap(long)]
    no_particles: bool,
}

impl Cli {
    /// Folds CLI overrides into the persisted config.
    fn apply_to(&self, cfg: &mut Config) {
        cfg.difficulty = self.difficulty;
        if let Some(mode) = self.mode {
            cfg.practice_mode = mode;
        }
        if let Some(display) = self.display {
            cfg.display_mode = display;
        }
        if let Some(len) = self.sequence_length {
            cfg.sequence_length = len;
        }
        if let Some(ms) = self.rhythm_interval_ms {
            cfg.rhythm_interval_ms = ms;
        }
        if self.drill.is_some() {
            cfg.drill = self.drill;
        }
        if self.no_sound {
            cfg.sound_enabled = false;
        }
        if self.no_particles {
            cfg.particles_enabled = false;
        }
    }
}

/// Rings the terminal bell for error and completion cues.
struct BellSink;

impl FeedbackSink for BellSink {
    fn cue(&mut self, cue: Cue) {
        match cue {
            Cue::KeyError | Cue::RoundComplete | Cue::BadgeEarned(_) => {
                let mut stdout = io::stdout();
                let _ = stdout.write_all(b"\x07");
                let _ = stdout.flush();
            }
            Cue::KeyCorrect(_) => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Menu,
    Round,
    Practice,
    Highscores,
    Badges,
}

pub struct App {
    pub view: View,
    pub config: Config,
    pub round: TypingRound,
    pub practice: PracticeSession,
    pub progress: Progress,
    pub celebration: Celebration,
    /// Badges earned by the most recent round, shown on the results screen.
    pub earned_badges: Vec<Badge>,
    store: FileProgressStore,
    feedback: Box<dyn FeedbackSink>,
}

impl App {
    pub fn new(config: Config, store: FileProgressStore, feedback: Box<dyn FeedbackSink>) -> Self {
        let progress = store.load();
        Self {
            view: View::Menu,
            round: TypingRound::new(config.difficulty),
            practice: PracticeSession::new(config.practice_settings()),
            progress,
            celebration: Celebration::new(),
            earned_badges: Vec::new(),
            config,
            store,
            feedback,
        }
    }

    fn start_round(&mut self, target: Option<String>, now: SystemTime) {
        self.leave_active_view(now);
        let target = target.unwrap_or_else(|| corpus::pick_text(self.config.difficulty));
        self.round.set_difficulty(self.config.difficulty);
        // Target texts come from non-empty pools; an empty custom text is
        // caught at CLI parse time
        if self.round.start(target, now).is_ok() {
            self.earned_badges.clear();
            self.view = View::Round;
        }
    }

    fn start_practice(&mut self, now: SystemTime) {
        self.leave_active_view(now);
        self.practice.start(now);
        self.view = View::Practice;
    }

    /// Tears down whatever the current view had running. No two sessions
    /// ever hold live deadlines at the same time.
    fn leave_active_view(&mut self, now: SystemTime) {
        self.round.reset();
        self.practice.reset(now);
        self.celebration.clear();
    }

    fn on_tick(&mut self, now: SystemTime) {
        self.round.on_tick(now);
        self.practice.on_tick(now);
        self.celebration.update(TICK_RATE_MS as f64 / 1000.0);
    }

    fn finish_round(&mut self, size: Size) {
        let date = chrono::Utc::now();
        self.earned_badges = self.progress.record_round(
            self.round.wpm(),
            self.round.accuracy(),
            self.round.difficulty(),
            date,
        );
        let _ = self.store.save(&self.progress);

        if self.config.sound_enabled {
            self.feedback.cue(Cue::RoundComplete);
            for badge in &self.earned_badges {
                self.feedback.cue(Cue::BadgeEarned(badge.id.clone()));
            }
        }
        if self.config.particles_enabled {
            self.celebration.start_round_complete(size.width, size.height);
        }
    }

    /// Returns false when the app should exit.
    fn handle_key(&mut self, key: KeyEvent, now: SystemTime, size: Size) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return false;
        }

        match self.view {
            View::Menu => self.handle_menu_key(key, now),
            View::Round => {
                self.handle_round_key(key, now, size);
                true
            }
            View::Practice => {
                self.handle_practice_key(key, now, size);
                true
            }
            View::Highscores => {
                match key.code {
                    KeyCode::Char('c') => {
                        self.progress.clear_highscores();
                        let _ = self.store.clear_highscores();
                    }
                    KeyCode::Esc => self.view = View::Menu,
                    _ => {}
                }
                true
            }
            View::Badges => {
                if key.code == KeyCode::Esc {
                    self.view = View::Menu;
                }
                true
            }
        }
    }

    fn handle_menu_key(&mut self, key: KeyEvent, now: SystemTime) -> bool {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return false,
            KeyCode::Char('1') => {
                self.config.difficulty = Difficulty::Beginner;
                self.start_round(None, now);
            }
            KeyCode::Char('2') => {
                self.config.difficulty = Difficulty::Intermediate;
                self.start_round(None, now);
            }
            KeyCode::Char('3') => {
                self.config.difficulty = Difficulty::Expert;
                self.start_round(None, now);
            }
            KeyCode::Char('p') => self.start_practice(now),
            KeyCode::Char('h') => self.view = View::Highscores,
            KeyCode::Char('b') => self.view = View::Badges,
            _ => {}
        }
        true
    }

    fn handle_round_key(&mut self, key: KeyEvent, now: SystemTime, size: Size) {
        if self.round.status() == RoundStatus::Finished {
            match key.code {
                KeyCode::Char('n') => self.start_round(None, now),
                KeyCode::Esc => {
                    self.leave_active_view(now);
                    self.view = View::Menu;
                }
                _ => {}
            }
            return;
        }

        let round_key = match key.code {
            KeyCode::Char(c) => Key::Char(c),
            KeyCode::Backspace => Key::Backspace,
            KeyCode::Esc => {
                self.leave_active_view(now);
                self.view = View::Menu;
                return;
            }
            // Unrecognized keys never reach the round
            _ => return,
        };

        match self.round.submit(round_key, now) {
            KeyOutcome::Incorrect => {
                if self.config.sound_enabled {
                    self.feedback.cue(Cue::KeyError);
                }
            }
            KeyOutcome::Finished => self.finish_round(size),
            KeyOutcome::Correct | KeyOutcome::Ignored => {}
        }
    }

    fn handle_practice_key(&mut self, key: KeyEvent, now: SystemTime, size: Size) {
        let c = match key.code {
            KeyCode::Char(c) => c,
            KeyCode::Esc => {
                self.practice.stop(now);
                self.celebration.clear();
                self.view = View::Menu;
                return;
            }
            _ => return,
        };

        match self.practice.submit(c, now) {
            PracticeOutcome::Correct => {
                if self.config.sound_enabled {
                    self.feedback.cue(Cue::KeyCorrect(c));
                }
                if self.config.particles_enabled {
                    self.celebration
                        .spawn_key_burst(size.width / 2, size.height / 3);
                }
            }
            PracticeOutcome::Incorrect => {
                if self.config.sound_enabled {
                    self.feedback.cue(Cue::KeyError);
                }
            }
            PracticeOutcome::Ignored => {}
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }
    if let Some(text) = &cli.text {
        if text.is_empty() {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::InvalidValue, "--text must not be empty")
                .exit();
        }
    }

    let config_store = FileConfigStore::new();
    let mut config = config_store.load();
    cli.apply_to(&mut config);
    let _ = config_store.save(&config);

    let feedback: Box<dyn FeedbackSink> = if config.sound_enabled {
        Box::new(BellSink)
    } else {
        Box::new(NullSink)
    };
    let mut app = App::new(config, FileProgressStore::new(), feedback);

    let now = SystemTime::now();
    if cli.text.is_some() {
        app.start_round(cli.text.clone(), now);
    } else if cli.practice {
        app.start_practice(now);
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let runner = Runner::new(
        CrosstermEventSource::new(),
        Duration::from_millis(TICK_RATE_MS),
    );
    let result = run(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run<B: Backend, E: EventSource>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E>,
) -> Result<(), Box<dyn Error>> {
    loop {
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;

        match runner.step() {
            AppEvent::Tick => app.on_tick(SystemTime::now()),
            AppEvent::Resize => {}
            AppEvent::Key(key) => {
                let size = terminal.size()?;
                if !app.handle_key(key, SystemTime::now(), size) {
                    break;
                }
            }
        }
    }

    Ok(())
}
