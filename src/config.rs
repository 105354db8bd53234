use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::corpus::Difficulty;
use crate::generator::{Finger, PracticeMode};
use crate::practice::{DisplayMode, PracticeSettings};

/// Persisted app settings, reloaded at startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub difficulty: Difficulty,
    pub practice_mode: PracticeMode,
    pub display_mode: DisplayMode,
    pub speed: f64,
    pub sequence_length: usize,
    pub rhythm_interval_ms: u64,
    pub show_keyboard: bool,
    pub sound_enabled: bool,
    pub particles_enabled: bool,
    pub drill: Option<Finger>,
}

impl Default for Config {
    fn default() -> Self {
        let practice = PracticeSettings::default();
        Self {
            difficulty: Difficulty::Beginner,
            practice_mode: practice.mode,
            display_mode: practice.display_mode,
            speed: practice.speed,
            sequence_length: practice.sequence_length,
            rhythm_interval_ms: practice.rhythm_interval_ms,
            show_keyboard: practice.show_keyboard,
            sound_enabled: practice.sound_enabled,
            particles_enabled: practice.particles_enabled,
            drill: practice.drill,
        }
    }
}

impl Config {
    pub fn practice_settings(&self) -> PracticeSettings {
        PracticeSettings {
            mode: self.practice_mode,
            display_mode: self.display_mode,
            speed: self.speed,
            show_keyboard: self.show_keyboard,
            sound_enabled: self.sound_enabled,
            particles_enabled: self.particles_enabled,
            sequence_length: self.sequence_length,
            rhythm_interval_ms: self.rhythm_interval_ms,
            drill: self.drill,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "tippwerk") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("tippwerk_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            if let Ok(cfg) = serde_json::from_slice::<Config>(&bytes) {
                return cfg;
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}
