use clap::ValueEnum;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// German letters ranked by corpus frequency, most common first.
const FREQUENCY_RANKED: &str = "enariltsuohdmgcfbwkpvzjxyqß";
const UMLAUTS: &str = "äöüÄÖÜß";
const SPECIALS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";

/// Which alphabet a practice session draws from.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, ValueEnum, strum_macros::Display, Serialize, Deserialize,
)]
pub enum PracticeMode {
    Letters,
    LettersNumbers,
    FullCharset,
    German,
    Minecraft,
}

impl PracticeMode {
    pub fn character_set(&self) -> &'static str {
        match self {
            PracticeMode::Letters => "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ",
            PracticeMode::LettersNumbers => {
                "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789"
            }
            PracticeMode::FullCharset => {
                "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*()_+-=[]{}|;:,.<>?"
            }
            PracticeMode::German => {
                "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZäöüßÄÖÜ0123456789.,!?-"
            }
            PracticeMode::Minecraft => {
                "WASDwasdefghijklmnopqrstuvwxyz0123456789~/@#$%^&*()_+-=[]{}|;:,.<>?"
            }
        }
    }
}

/// QWERTZ finger groups for targeted drills.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, ValueEnum, strum_macros::Display, Serialize, Deserialize,
)]
pub enum Finger {
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub fn character_set(&self) -> &'static str {
        match self {
            Finger::Index => "fgjh",
            Finger::Middle => "dkei",
            Finger::Ring => "slow",
            Finger::Pinky => "aqpöü",
        }
    }
}

/// Anything that hands out practice targets. Sessions depend on this trait
/// so tests can substitute a deterministic source.
pub trait CharSource {
    fn next_char(&mut self) -> char;

    fn next_sequence(&mut self, length: usize) -> Vec<char> {
        (0..length).map(|_| self.next_char()).collect()
    }
}

/// Draws random characters from a mode-specific alphabet, biased toward
/// common German letters and umlauts.
#[derive(Debug, Clone)]
pub struct CharacterGenerator {
    mode: PracticeMode,
    weighted_pool: Vec<char>,
}

fn weight_of(c: char) -> usize {
    let lower = c.to_lowercase().next().unwrap_or(c);
    let mut weight = 1;

    if let Some(rank) = FREQUENCY_RANKED.chars().position(|f| f == lower) {
        weight = ((8.0 - rank as f64 / 3.0).floor() as i64).max(1) as usize;
    }

    // Umlauts get extra practice, digits and specials stay rare
    if UMLAUTS.contains(c) {
        weight = 3;
    }
    if c.is_ascii_digit() || SPECIALS.contains(c) {
        weight = 1;
    }

    weight
}

fn build_weighted_pool(mode: PracticeMode) -> Vec<char> {
    let mut pool = Vec::new();
    for c in mode.character_set().chars() {
        for _ in 0..weight_of(c) {
            pool.push(c);
        }
    }
    pool
}

impl CharacterGenerator {
    pub fn new(mode: PracticeMode) -> Self {
        Self {
            mode,
            weighted_pool: build_weighted_pool(mode),
        }
    }

    pub fn mode(&self) -> PracticeMode {
        self.mode
    }

    /// Rebuilds the weighted pool for a new alphabet. Callers must not swap
    /// modes while a session is mid-exercise; `PracticeSession` enforces that.
    pub fn set_mode(&mut self, mode: PracticeMode) {
        self.mode = mode;
        self.weighted_pool = build_weighted_pool(mode);
    }

    pub fn generate_char(&self) -> char {
        *self
            .weighted_pool
            .choose(&mut rand::thread_rng())
            .expect("weighted pool is empty")
    }

    pub fn generate_sequence(&self, length: usize) -> Vec<char> {
        (0..length).map(|_| self.generate_char()).collect()
    }
}

impl CharSource for CharacterGenerator {
    fn next_char(&mut self) -> char {
        self.generate_char()
    }
}

/// Uniform sampler over a single finger's QWERTZ keys.
#[derive(Debug, Clone)]
pub struct FingerDrill {
    chars: Vec<char>,
}

impl FingerDrill {
    pub fn new(finger: Finger) -> Self {
        Self {
            chars: finger.character_set().chars().collect(),
        }
    }
}

impl CharSource for FingerDrill {
    fn next_char(&mut self) -> char {
        *self
            .chars
            .choose(&mut rand::thread_rng())
            .expect("finger group is empty")
    }
}

/// One-shot drill sequence over a single finger's keys.
pub fn finger_exercise(finger: Finger, length: usize) -> Vec<char> {
    FingerDrill::new(finger).next_sequence(length)
}
