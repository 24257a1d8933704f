use std::path::PathBuf;

/// Rejected user input at the login prompt
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InputError {
    #[error("username cannot be empty")]
    EmptyUsername,
}

/// Failure reading or writing a user's history
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("history file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("history record: {0}")]
    Csv(#[from] csv::Error),
}

/// Failure building a chart or report from history
#[derive(Debug, thiserror::Error)]
pub enum PresentationError {
    #[error("no history recorded for {user}")]
    NoHistory { user: String },
    #[error("cannot read history: {0}")]
    Storage(#[from] StorageError),
    #[error("cannot write report {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Session operation attempted in a phase that does not allow it
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no user is logged in")]
    NotLoggedIn,
    #[error("a user is already logged in")]
    AlreadyLoggedIn,
    #[error("a trial is already running")]
    AlreadyRunning,
    #[error(transparent)]
    Input(#[from] InputError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_user_facing() {
        assert_eq!(
            InputError::EmptyUsername.to_string(),
            "username cannot be empty"
        );
        assert_eq!(
            SessionError::from(InputError::EmptyUsername).to_string(),
            "username cannot be empty"
        );
        let err = PresentationError::NoHistory {
            user: "alice".into(),
        };
        assert_eq!(err.to_string(), "no history recorded for alice");
    }

    #[test]
    fn storage_error_names_the_file() {
        let err = StorageError::Io {
            path: PathBuf::from("/tmp/alice_scores.csv"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("alice_scores.csv"));
    }
}
