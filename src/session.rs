use crate::clock::Clock;
use crate::error::{InputError, SessionError, StorageError};
use crate::history::{HistoryStore, TrialResult};
use crate::language::{Difficulty, SentenceGenerator};
use crate::scoring;
use rand::{rngs::StdRng, Rng};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Countdown length of every trial, in time units
pub const DURATION_BUDGET: u32 = 60;
/// Remaining budget at or below which each tick raises an alert
pub const ALERT_THRESHOLD: u32 = 5;
pub const TIME_UNIT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    LoggedOut,
    Idle,
    Running,
    Graded,
}

/// The trial currently being typed
#[derive(Debug, Clone, PartialEq)]
pub struct Trial {
    pub prompt: String,
    pub typed: String,
    pub difficulty: Difficulty,
    pub started_at: Duration,
    pub remaining: u32,
}

/// What the user is shown once a trial is graded
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub result: TrialResult,
    /// seconds between start and grading
    pub elapsed: f64,
    pub saved: bool,
}

#[derive(Debug)]
pub struct Submission {
    pub outcome: Outcome,
    /// set when the result could not be persisted
    pub storage_error: Option<StorageError>,
}

/// One countdown decrement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub remaining: u32,
    pub alert: bool,
}

#[derive(Debug, Default)]
pub struct TickReport {
    pub ticks: Vec<Tick>,
    /// present when the countdown ran out and the trial was graded
    pub submission: Option<Submission>,
}

impl TickReport {
    pub fn alerts(&self) -> usize {
        self.ticks.iter().filter(|t| t.alert).count()
    }
}

/// Lifecycle of typing trials for the logged in user.
///
/// All operations take `&mut self`, so ticks, starts and submissions are
/// serialized by whoever owns the session (the UI event loop).
pub struct Session<R: Rng = StdRng> {
    phase: Phase,
    user: Option<String>,
    trial: Option<Trial>,
    last_outcome: Option<Outcome>,
    generator: SentenceGenerator<R>,
    clock: Box<dyn Clock>,
    store: Box<dyn HistoryStore>,
}

impl<R: Rng> fmt::Debug for Session<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("phase", &self.phase)
            .field("user", &self.user)
            .field("trial", &self.trial)
            .field("last_outcome", &self.last_outcome)
            .finish_non_exhaustive()
    }
}

impl<R: Rng> Session<R> {
    pub fn new(
        generator: SentenceGenerator<R>,
        clock: impl Clock + 'static,
        store: impl HistoryStore + 'static,
    ) -> Self {
        Self {
            phase: Phase::LoggedOut,
            user: None,
            trial: None,
            last_outcome: None,
            generator,
            clock: Box::new(clock),
            store: Box::new(store),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn trial(&self) -> Option<&Trial> {
        self.trial.as_ref()
    }

    pub fn last_outcome(&self) -> Option<&Outcome> {
        self.last_outcome.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn login(&mut self, name: &str) -> Result<(), SessionError> {
        if self.phase != Phase::LoggedOut {
            return Err(SessionError::AlreadyLoggedIn);
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(InputError::EmptyUsername.into());
        }

        info!(user = name, "logged in");
        self.user = Some(name.to_string());
        self.phase = Phase::Idle;
        Ok(())
    }

    /// Back to the login prompt; a running trial is dropped ungraded
    pub fn logout(&mut self) {
        if let Some(trial) = self.trial.take() {
            debug!(remaining = trial.remaining, "discarding ungraded trial");
        }
        if let Some(user) = self.user.take() {
            info!(user = %user, "logged out");
        }
        self.last_outcome = None;
        self.phase = Phase::LoggedOut;
    }

    pub fn start(&mut self, difficulty: Difficulty) -> Result<&Trial, SessionError> {
        match self.phase {
            Phase::LoggedOut => return Err(SessionError::NotLoggedIn),
            Phase::Running => return Err(SessionError::AlreadyRunning),
            Phase::Idle | Phase::Graded => {}
        }

        let prompt = self.generator.generate(difficulty.word_count());
        debug!(%difficulty, words = difficulty.word_count(), "starting trial");

        self.last_outcome = None;
        self.phase = Phase::Running;
        Ok(self.trial.insert(Trial {
            prompt,
            typed: String::new(),
            difficulty,
            started_at: self.clock.now(),
            remaining: DURATION_BUDGET,
        }))
    }

    fn running_trial(&mut self) -> Option<&mut Trial> {
        match self.phase {
            Phase::Running => self.trial.as_mut(),
            _ => None,
        }
    }

    pub fn type_char(&mut self, c: char) {
        if let Some(trial) = self.running_trial() {
            trial.typed.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(trial) = self.running_trial() {
            trial.typed.pop();
        }
    }

    pub fn set_typed(&mut self, text: &str) {
        if let Some(trial) = self.running_trial() {
            trial.typed = text.to_string();
        }
    }

    /// Catch the countdown up with the clock, grading the trial if it runs out
    pub fn tick(&mut self) -> TickReport {
        let now = self.clock.now();
        let mut report = TickReport::default();
        let Some(trial) = self.running_trial() else {
            return report;
        };

        let elapsed_units = (now.saturating_sub(trial.started_at).as_secs()
            / TIME_UNIT.as_secs())
        .min(DURATION_BUDGET as u64) as u32;
        let consumed = DURATION_BUDGET - trial.remaining;

        for _ in consumed..elapsed_units {
            let alert = trial.remaining <= ALERT_THRESHOLD;
            trial.remaining -= 1;
            report.ticks.push(Tick {
                remaining: trial.remaining,
                alert,
            });
        }

        if trial.remaining == 0 {
            debug!("countdown expired");
            report.submission = self.submit();
        }
        report
    }

    /// Grade the running trial; does nothing in any other phase
    pub fn submit(&mut self) -> Option<Submission> {
        if self.phase != Phase::Running {
            debug!(phase = ?self.phase, "ignoring submit outside a running trial");
            return None;
        }
        let trial = self.trial.take()?;
        let user = self.user.clone()?;

        let elapsed = self
            .clock
            .now()
            .saturating_sub(trial.started_at)
            .as_secs_f64();
        let speed = scoring::speed(scoring::word_count(&trial.typed), elapsed);
        let result = TrialResult {
            timestamp: self.clock.timestamp(),
            speed,
            accuracy: scoring::accuracy(&trial.typed, &trial.prompt),
            score: scoring::grade(speed),
        };

        let storage_error = self.store.append(&user, &result).err();
        if let Some(ref e) = storage_error {
            warn!(user = %user, error = %e, "trial result not saved");
        }
        info!(
            user = %user,
            speed = result.speed,
            accuracy = result.accuracy,
            score = result.score,
            "trial graded"
        );

        let outcome = Outcome {
            result,
            elapsed,
            saved: storage_error.is_none(),
        };
        self.last_outcome = Some(outcome.clone());
        self.phase = Phase::Graded;
        Some(Submission {
            outcome,
            storage_error,
        })
    }

    /// The logged in user's stored history, oldest first
    pub fn history(&self) -> Result<Vec<TrialResult>, StorageError> {
        match self.user {
            Some(ref user) => self.store.read_all(user),
            None => Ok(Vec::new()),
        }
    }
}
