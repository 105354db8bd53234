use clap::ValueEnum;
use include_dir::{include_dir, Dir};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

static TEXT_DIR: Dir = include_dir!("src/texts");

/// Skill level selecting which text pool a round samples from.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, ValueEnum, strum_macros::Display, Serialize, Deserialize,
)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Expert,
}

impl Difficulty {
    /// German label shown in the UI, matching the badge descriptions.
    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "Anfänger",
            Difficulty::Intermediate => "Fortgeschritten",
            Difficulty::Expert => "Experte",
        }
    }

    fn file_name(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner.json",
            Difficulty::Intermediate => "intermediate.json",
            Difficulty::Expert => "expert.json",
        }
    }
}

#[allow(dead_code)]
#[derive(Deserialize, Clone, Debug)]
struct TextPool {
    name: String,
    texts: Vec<String>,
}

fn load_pool(difficulty: Difficulty) -> TextPool {
    let file = TEXT_DIR
        .get_file(difficulty.file_name())
        .expect("Text pool file not found");

    let file_as_str = file
        .contents_utf8()
        .expect("Unable to interpret file as a string");

    serde_json::from_str(file_as_str).expect("Unable to deserialize text pool json")
}

/// Pick one target text uniformly at random from the pool for `difficulty`.
pub fn pick_text(difficulty: Difficulty) -> String {
    let pool = load_pool(difficulty);
    pool.texts
        .choose(&mut rand::thread_rng())
        .cloned()
        .expect("Text pool is empty")
}
