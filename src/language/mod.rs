pub mod core;
pub mod difficulty;
pub mod sentences;

pub use self::core::{Vocabulary, VocabularyError};
pub use difficulty::Difficulty;
pub use sentences::SentenceGenerator;
