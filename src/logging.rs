use std::path::Path;
use std::sync::Once;
use tracing_appender::non_blocking::WorkerGuard;

static INIT: Once = Once::new();

pub const LOG_ENV: &str = "TYPESPEED_LOG";
pub const LOG_FILE: &str = "typespeed.log";

/// Route tracing output to a file in `log_dir`; the terminal belongs to the UI.
///
/// Only the first call installs a subscriber. Keep the returned guard alive
/// until exit so buffered lines are flushed.
pub fn init_logging(log_dir: &Path) -> Option<WorkerGuard> {
    let mut guard = None;
    INIT.call_once(|| {
        if std::fs::create_dir_all(log_dir).is_err() {
            return;
        }
        let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
        let (non_blocking, worker) = tracing_appender::non_blocking(file_appender);

        let installed = tracing_subscriber::fmt()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("typespeed=info")),
            )
            .try_init()
            .is_ok();

        if installed {
            guard = Some(worker);
        }
    });
    guard
}
