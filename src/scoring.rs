//! Pure scoring functions for a graded trial.

/// Length of the period speeds are normalized to (one minute)
pub const SPEED_PERIOD: f64 = 60.0;

/// Lower bound of each scoring tier, highest first, with the score awarded
const GRADE_TIERS: [(f64, u32); 3] = [(60.0, 100), (40.0, 80), (20.0, 60)];
const GRADE_FLOOR: u32 = 40;

/// Whitespace separated tokens in the typed buffer
pub fn word_count(typed: &str) -> usize {
    typed.split_whitespace().count()
}

/// Words per minute for `words` typed over `elapsed` seconds; 0 when no time has passed
pub fn speed(words: usize, elapsed: f64) -> f64 {
    if elapsed <= 0.0 {
        return 0.0;
    }
    (words as f64 / elapsed) * SPEED_PERIOD
}

/// Percentage of reference words matched position by position
pub fn accuracy(typed: &str, reference: &str) -> f64 {
    let reference_words: Vec<&str> = reference.split_whitespace().collect();
    if reference_words.is_empty() {
        return 0.0;
    }

    let correct = typed
        .split_whitespace()
        .zip(reference_words.iter())
        .filter(|(typed, expected)| typed == *expected)
        .count();

    100.0 * correct as f64 / reference_words.len() as f64
}

pub fn grade(speed_wpm: f64) -> u32 {
    GRADE_TIERS
        .iter()
        .find(|(lower, _)| speed_wpm >= *lower)
        .map_or(GRADE_FLOOR, |(_, score)| *score)
}
