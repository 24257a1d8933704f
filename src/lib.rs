// Library surface for headless/integration tests and reuse.
// The terminal shell (App, rendering, key handling) lives in the binary.
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod history;
pub mod language;
pub mod logging;
pub mod report;
pub mod runtime;
pub mod scoring;
pub mod session;
pub mod sound;

pub use error::{InputError, PresentationError, SessionError, StorageError};
pub use history::{CsvHistoryStore, HistoryStore, MemoryHistoryStore, TrialResult};
pub use language::{Difficulty, SentenceGenerator};
pub use session::{Outcome, Phase, Session, Submission, Tick, TickReport, Trial};
