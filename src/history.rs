use crate::error::StorageError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Immutable outcome of one graded trial, as stored in a user's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    pub speed: f64,
    pub accuracy: f64,
    pub score: u32,
}

mod timestamp_format {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT)
            .map_err(serde::de::Error::custom)
    }
}

/// Append-only, per-user record of trial results
pub trait HistoryStore: Send {
    fn append(&self, user: &str, result: &TrialResult) -> Result<(), StorageError>;

    /// All results for `user`, oldest first; a user with no history yields an empty list
    fn read_all(&self, user: &str) -> Result<Vec<TrialResult>, StorageError>;
}

/// One headerless CSV file per user: `timestamp,speed,accuracy,score`
#[derive(Debug, Clone)]
pub struct CsvHistoryStore {
    dir: PathBuf,
}

impl CsvHistoryStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, user: &str) -> PathBuf {
        self.dir.join(format!("{}_scores.csv", file_stem(user)))
    }
}

/// Username reduced to characters safe in a file name
pub fn file_stem(user: &str) -> String {
    user.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Terminate a trailing partial row so the next append starts on its own line
fn close_partial_row(file: &mut File) -> io::Result<()> {
    if file.metadata()?.len() == 0 {
        return Ok(());
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    if last[0] != b'\n' {
        file.write_all(b"\n")?;
    }
    Ok(())
}

impl HistoryStore for CsvHistoryStore {
    fn append(&self, user: &str, result: &TrialResult) -> Result<(), StorageError> {
        let path = self.path_for(user);
        let io_err = |source| StorageError::Io {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(io_err)?;
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)
            .map_err(io_err)?;
        close_partial_row(&mut file).map_err(io_err)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.serialize(result)?;
        writer.flush().map_err(io_err)?;

        debug!(user, path = %path.display(), "appended trial result");
        Ok(())
    }

    fn read_all(&self, user: &str) -> Result<Vec<TrialResult>, StorageError> {
        let path = self.path_for(user);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StorageError::Io { path, source }),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut results = Vec::new();
        for (line, row) in reader.deserialize::<TrialResult>().enumerate() {
            match row {
                Ok(result) => results.push(result),
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => warn!(user, line = line + 1, error = %e, "skipping malformed history row"),
            }
        }
        Ok(results)
    }
}

/// In-process history; clones share the same records
#[derive(Debug, Clone, Default)]
pub struct MemoryHistoryStore {
    records: Arc<Mutex<HashMap<String, Vec<TrialResult>>>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn append(&self, user: &str, result: &TrialResult) -> Result<(), StorageError> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records
            .entry(user.to_string())
            .or_default()
            .push(result.clone());
        Ok(())
    }

    fn read_all(&self, user: &str) -> Result<Vec<TrialResult>, StorageError> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(records.get(user).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn result_at(secs: u32, speed: f64, accuracy: f64, score: u32) -> TrialResult {
        TrialResult {
            timestamp: NaiveDate::from_ymd_opt(2024, 3, 9)
                .unwrap()
                .and_hms_opt(14, 0, secs)
                .unwrap(),
            speed,
            accuracy,
            score,
        }
    }

    #[test]
    fn read_missing_history_is_empty() {
        let dir = tempdir().unwrap();
        let store = CsvHistoryStore::new(dir.path().join("not-yet-created"));
        assert!(store.read_all("alice").unwrap().is_empty());
    }

    #[test]
    fn append_then_read_preserves_order_and_values() {
        let dir = tempdir().unwrap();
        let store = CsvHistoryStore::new(dir.path());
        let results = vec![
            result_at(1, 40.0, 100.0, 80),
            result_at(2, 12.345678901, 33.333333333333336, 40),
            result_at(3, 61.2, 97.5, 100),
        ];

        for r in &results {
            store.append("alice", r).unwrap();
        }

        assert_eq!(store.read_all("alice").unwrap(), results);
        assert!(store.read_all("bob").unwrap().is_empty());
    }

    #[test]
    fn file_format_is_one_row_per_result() {
        let dir = tempdir().unwrap();
        let store = CsvHistoryStore::new(dir.path());
        store.append("alice", &result_at(5, 40.0, 100.0, 80)).unwrap();

        let contents = fs::read_to_string(store.path_for("alice")).unwrap();
        assert_eq!(contents, "2024-03-09 14:00:05,40.0,100.0,80\n");
    }

    #[test]
    fn partial_and_garbage_rows_are_skipped() {
        let dir = tempdir().unwrap();
        let store = CsvHistoryStore::new(dir.path());
        store.append("alice", &result_at(1, 40.0, 100.0, 80)).unwrap();

        let mut file = OpenOptions::new()
            .append(true)
            .open(store.path_for("alice"))
            .unwrap();
        writeln!(file, "not a row at all").unwrap();
        writeln!(file, "2024-03-09 14:00:02,55.5,90.0,80").unwrap();
        write!(file, "2024-03-09 14:00:03,21.0").unwrap();

        let read = store.read_all("alice").unwrap();
        assert_eq!(read.len(), 2);
        assert_eq!(read[1].speed, 55.5);
    }

    #[test]
    fn append_after_a_truncated_row_starts_a_new_line() {
        let dir = tempdir().unwrap();
        let store = CsvHistoryStore::new(dir.path());
        fs::write(store.path_for("alice"), "2024-03-09 14:00:01,40.0").unwrap();

        store.append("alice", &result_at(2, 55.5, 90.0, 80)).unwrap();

        let contents = fs::read_to_string(store.path_for("alice")).unwrap();
        assert_eq!(
            contents,
            "2024-03-09 14:00:01,40.0\n2024-03-09 14:00:02,55.5,90.0,80\n"
        );
        let read = store.read_all("alice").unwrap();
        assert_eq!(read, vec![result_at(2, 55.5, 90.0, 80)]);
    }

    #[test]
    fn reads_rows_written_by_hand() {
        let dir = tempdir().unwrap();
        let store = CsvHistoryStore::new(dir.path());
        fs::write(store.path_for("carol"), "2023-12-31 23:59:59, 38.5 , 75.0 ,60\n").unwrap();

        let read = store.read_all("carol").unwrap();
        assert_eq!(read, vec![TrialResult {
            timestamp: NaiveDate::from_ymd_opt(2023, 12, 31)
                .unwrap()
                .and_hms_opt(23, 59, 59)
                .unwrap(),
            speed: 38.5,
            accuracy: 75.0,
            score: 60,
        }]);
    }

    #[test]
    fn append_fails_when_directory_is_a_file() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("history");
        fs::write(&blocker, "").unwrap();
        let store = CsvHistoryStore::new(&blocker);

        assert_matches!(
            store.append("alice", &result_at(1, 1.0, 1.0, 40)),
            Err(StorageError::Io { .. })
        );
    }

    #[test]
    fn usernames_map_to_safe_file_names() {
        assert_eq!(file_stem("alice"), "alice");
        assert_eq!(file_stem("../etc/passwd"), "___etc_passwd");
        assert_eq!(file_stem("Jo Ann"), "Jo_Ann");

        let store = CsvHistoryStore::new("/data");
        assert_eq!(
            store.path_for("Jo Ann"),
            PathBuf::from("/data/Jo_Ann_scores.csv")
        );
    }

    #[test]
    fn memory_store_partitions_by_user() {
        let store = MemoryHistoryStore::new();
        let shared = store.clone();
        store.append("alice", &result_at(1, 40.0, 100.0, 80)).unwrap();
        store.append("bob", &result_at(2, 10.0, 50.0, 40)).unwrap();
        store.append("alice", &result_at(3, 70.0, 90.0, 100)).unwrap();

        let alice = shared.read_all("alice").unwrap();
        assert_eq!(alice.len(), 2);
        assert_eq!(alice[1].score, 100);
        assert_eq!(shared.read_all("bob").unwrap().len(), 1);
        assert!(shared.read_all("dave").unwrap().is_empty());
    }
}
