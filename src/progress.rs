use chrono::{DateTime, Local, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::corpus::Difficulty;

pub const MAX_HIGHSCORES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highscore {
    pub wpm: u32,
    pub accuracy: f64,
    pub difficulty: Difficulty,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BadgeMetric {
    Wpm,
    Accuracy,
    GamesPlayed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    pub id: String,
    pub name: String,
    pub description: String,
    pub achieved: bool,
    pub metric: BadgeMetric,
    pub threshold: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub difficulty: Option<Difficulty>,
}

impl Badge {
    fn new(
        id: &str,
        name: &str,
        description: &str,
        metric: BadgeMetric,
        threshold: u32,
        difficulty: Option<Difficulty>,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            achieved: false,
            metric,
            threshold,
            difficulty,
        }
    }
}

/// The Minecraft-themed badge set, all unachieved.
pub fn initial_badges() -> Vec<Badge> {
    vec![
        Badge::new(
            "wpm-beginner",
            "🌱 Sprössling Schreiber",
            "Erreiche 40 WPM im Gras-Level. Erstes Wachstum!",
            BadgeMetric::Wpm,
            40,
            Some(Difficulty::Beginner),
        ),
        Badge::new(
            "wpm-intermediate",
            "⚡ Redstone Rekord",
            "Erreiche 60 WPM im Diamant-Level. Energie pur!",
            BadgeMetric::Wpm,
            60,
            Some(Difficulty::Intermediate),
        ),
        Badge::new(
            "wpm-expert",
            "🔥 Enderdrachen Tipper",
            "Erreiche 80 WPM im Nether-Level. Legendär!",
            BadgeMetric::Wpm,
            80,
            Some(Difficulty::Expert),
        ),
        Badge::new(
            "accuracy-95",
            "🎯 Bogenschütze",
            "Treffe 95% deiner Tasten. Präzision wie ein Skeleton!",
            BadgeMetric::Accuracy,
            95,
            None,
        ),
        Badge::new(
            "accuracy-100",
            "💎 Perfekter Crafter",
            "Null Fehler! Du bist ein wahrer Minecraft-Meister!",
            BadgeMetric::Accuracy,
            100,
            None,
        ),
        Badge::new(
            "games-10",
            "🛡️ Ausdauer-Krieger",
            "Überlebe 10 Tipp-Abenteuer. Wahre Ausdauer!",
            BadgeMetric::GamesPlayed,
            10,
            None,
        ),
    ]
}

/// Cross-session state: top-10 highscores, badge flags and the games-played
/// counter.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub highscores: Vec<Highscore>,
    pub badges: Vec<Badge>,
    pub games_played: u32,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            highscores: Vec::new(),
            badges: initial_badges(),
            games_played: 0,
        }
    }
}

impl Progress {
    /// Registers a completed round: bumps the games counter, inserts the
    /// highscore (descending by wpm, stable for ties, capped at 10) and
    /// evaluates not-yet-achieved badges. Returns badges earned just now.
    pub fn record_round(
        &mut self,
        wpm: u32,
        accuracy: f64,
        difficulty: Difficulty,
        date: DateTime<Utc>,
    ) -> Vec<Badge> {
        self.games_played += 1;

        self.highscores.push(Highscore {
            wpm,
            accuracy,
            difficulty,
            date,
        });
        self.highscores.sort_by(|a, b| b.wpm.cmp(&a.wpm));
        self.highscores.truncate(MAX_HIGHSCORES);

        let games_played = self.games_played;
        let mut earned = Vec::new();
        for badge in &mut self.badges {
            if badge.achieved {
                continue;
            }
            let achieved = match badge.metric {
                BadgeMetric::Wpm => {
                    badge.difficulty == Some(difficulty) && wpm >= badge.threshold
                }
                BadgeMetric::Accuracy => accuracy >= badge.threshold as f64,
                BadgeMetric::GamesPlayed => games_played >= badge.threshold,
            };
            if achieved {
                badge.achieved = true;
                earned.push(badge.clone());
            }
        }
        earned
    }

    pub fn clear_highscores(&mut self) {
        self.highscores.clear();
    }
}

/// Durable storage behind the progress state.
pub trait ProgressStore {
    fn load(&self) -> Progress;
    fn save(&self, progress: &Progress) -> io::Result<()>;
    fn clear_highscores(&self) -> io::Result<()>;
}

const HIGHSCORES_FILE: &str = "highscores.json";
const BADGES_FILE: &str = "badges.json";
const GAMES_PLAYED_FILE: &str = "games_played.json";
const LOG_FILE: &str = "tippwerk.log";

/// JSON files under the platform data directory, one per logical key.
/// Loading is best-effort: absent or malformed keys fall back to defaults
/// and leave a line in the log file instead of failing.
#[derive(Debug, Clone)]
pub struct FileProgressStore {
    dir: PathBuf,
}

impl FileProgressStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let dir = if let Some(pd) = ProjectDirs::from("", "", "tippwerk") {
            pd.data_local_dir().to_path_buf()
        } else {
            PathBuf::from("tippwerk_data")
        };
        Self { dir }
    }

    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn read_key<T: serde::de::DeserializeOwned>(&self, file: &str) -> Option<T> {
        let path = self.dir.join(file);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                self.log_warning(&format!("{file}: read failed, using defaults: {e}"));
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                self.log_warning(&format!("{file}: malformed, using defaults: {e}"));
                None
            }
        }
    }

    fn write_key<T: Serialize>(&self, file: &str, value: &T) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let data = serde_json::to_vec_pretty(value).unwrap_or_default();
        fs::write(self.dir.join(file), data)
    }

    fn log_warning(&self, msg: &str) {
        let _ = fs::create_dir_all(&self.dir);
        if let Ok(mut log_file) = OpenOptions::new()
            .append(true)
            .create(true)
            .open(self.dir.join(LOG_FILE))
        {
            let _ = writeln!(log_file, "{} WARN {msg}", Local::now().format("%c"));
        }
    }
}

/// Keeps known achieved flags while picking up new badge definitions.
fn merge_badges(saved: Vec<Badge>) -> Vec<Badge> {
    let mut badges = initial_badges();
    for badge in &mut badges {
        if saved.iter().any(|s| s.id == badge.id && s.achieved) {
            badge.achieved = true;
        }
    }
    badges
}

impl ProgressStore for FileProgressStore {
    fn load(&self) -> Progress {
        let highscores: Vec<Highscore> = self.read_key(HIGHSCORES_FILE).unwrap_or_default();
        let badges = self
            .read_key::<Vec<Badge>>(BADGES_FILE)
            .map(merge_badges)
            .unwrap_or_else(initial_badges);
        let games_played: u32 = self.read_key(GAMES_PLAYED_FILE).unwrap_or_default();

        Progress {
            highscores,
            badges,
            games_played,
        }
    }

    fn save(&self, progress: &Progress) -> io::Result<()> {
        self.write_key(HIGHSCORES_FILE, &progress.highscores)?;
        self.write_key(BADGES_FILE, &progress.badges)?;
        self.write_key(GAMES_PLAYED_FILE, &progress.games_played)
    }

    fn clear_highscores(&self) -> io::Result<()> {
        match fs::remove_file(self.dir.join(HIGHSCORES_FILE)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}
