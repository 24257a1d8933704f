use super::core::Vocabulary;
use itertools::Itertools;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

/// Builds prompt sentences from a vocabulary with an owned random source
#[derive(Debug)]
pub struct SentenceGenerator<R: Rng = StdRng> {
    vocabulary: Vocabulary,
    rng: R,
}

impl SentenceGenerator<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(Vocabulary::english(), StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(Vocabulary::english(), StdRng::from_entropy())
    }
}

impl<R: Rng> SentenceGenerator<R> {
    pub fn new(vocabulary: Vocabulary, rng: R) -> Self {
        Self { vocabulary, rng }
    }

    /// `word_count` words drawn uniformly with replacement, capitalized, ending in a period
    pub fn generate(&mut self, word_count: usize) -> String {
        if word_count == 0 {
            return String::new();
        }

        let words = &self.vocabulary.words;
        let rng = &mut self.rng;
        let body = (0..word_count)
            .filter_map(|_| words.choose(&mut *rng))
            .join(" ");

        let mut chars = body.chars();
        match chars.next() {
            Some(first) => format!("{}{}.", first.to_uppercase(), chars.as_str()),
            None => String::new(),
        }
    }
}
