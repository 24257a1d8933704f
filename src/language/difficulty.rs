use serde::{Deserialize, Serialize};

/// Trial difficulty, selecting the prompt length
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn word_count(&self) -> usize {
        match self {
            Difficulty::Easy => 20,
            Difficulty::Medium => 40,
            Difficulty::Hard => 60,
        }
    }

    /// Next difficulty in menu order, wrapping around
    pub fn next(&self) -> Self {
        match self {
            Difficulty::Easy => Difficulty::Medium,
            Difficulty::Medium => Difficulty::Hard,
            Difficulty::Hard => Difficulty::Easy,
        }
    }
}
