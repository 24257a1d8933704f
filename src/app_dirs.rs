use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "typespeed";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// `$HOME/.local/state/typespeed`, falling back to the platform data dir
    pub fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(PathBuf::from(home).join(".local").join("state").join(APP_NAME))
        } else {
            ProjectDirs::from("", "", APP_NAME).map(|pd| pd.data_local_dir().to_path_buf())
        }
    }

    pub fn history_dir() -> PathBuf {
        Self::state_dir()
            .map(|dir| dir.join("history"))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn log_dir() -> PathBuf {
        Self::state_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn config_path() -> PathBuf {
        ProjectDirs::from("", "", APP_NAME)
            .map(|pd| pd.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from("typespeed_config.json"))
    }
}
