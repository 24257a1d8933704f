use include_dir::{include_dir, Dir};
use serde::Deserialize;
use serde_json::from_str;

static LANG_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/lang");

#[derive(Debug, thiserror::Error)]
pub enum VocabularyError {
    #[error("vocabulary file {0} not found")]
    NotFound(String),
    #[error("vocabulary file {0} is not valid utf-8")]
    Encoding(String),
    #[error("vocabulary file {name}: {source}")]
    Parse {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("vocabulary {0} has no words")]
    Empty(String),
}

/// Fixed word list prompts are drawn from
#[derive(Deserialize, Clone, Debug)]
pub struct Vocabulary {
    pub name: String,
    pub words: Vec<String>,
}

impl Vocabulary {
    pub fn load(name: &str) -> Result<Self, VocabularyError> {
        let file_name = format!("{name}.json");
        let file = LANG_DIR
            .get_file(&file_name)
            .ok_or_else(|| VocabularyError::NotFound(file_name.clone()))?;
        let contents = file
            .contents_utf8()
            .ok_or_else(|| VocabularyError::Encoding(file_name.clone()))?;
        Self::from_json(&file_name, contents)
    }

    pub fn from_json(name: &str, json: &str) -> Result<Self, VocabularyError> {
        let vocabulary: Vocabulary = from_str(json).map_err(|source| VocabularyError::Parse {
            name: name.to_string(),
            source,
        })?;
        if vocabulary.words.is_empty() {
            return Err(VocabularyError::Empty(vocabulary.name));
        }
        Ok(vocabulary)
    }

    pub fn english() -> Self {
        // bundled at compile time and covered by tests
        Self::load("english").expect("bundled english vocabulary")
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::english()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_english_vocabulary() {
        let vocab = Vocabulary::english();

        assert_eq!(vocab.name, "english");
        assert_eq!(vocab.words.len(), 43);
        assert!(vocab.words.len() >= 20);
        assert!(vocab.words.iter().all(|w| !w.contains(char::is_whitespace)));
    }

    #[test]
    fn test_missing_vocabulary() {
        assert_matches!(
            Vocabulary::load("klingon"),
            Err(VocabularyError::NotFound(name)) if name == "klingon.json"
        );
    }

    #[test]
    fn test_vocabulary_deserialization() {
        let json_data = r#"
        {
            "name": "test",
            "words": ["hello", "world", "test"]
        }
        "#;

        let vocab = Vocabulary::from_json("test", json_data).unwrap();

        assert_eq!(vocab.name, "test");
        assert_eq!(vocab.words, vec!["hello", "world", "test"]);
    }

    #[test]
    fn test_empty_vocabulary_rejected() {
        let json_data = r#"{ "name": "none", "words": [] }"#;
        assert_matches!(
            Vocabulary::from_json("none.json", json_data),
            Err(VocabularyError::Empty(name)) if name == "none"
        );
    }

    #[test]
    fn test_malformed_vocabulary_rejected() {
        assert_matches!(
            Vocabulary::from_json("bad", "{ \"name\": 3 }"),
            Err(VocabularyError::Parse { .. })
        );
    }
}
