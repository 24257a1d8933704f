use crate::error::PresentationError;
use crate::history::{file_stem, TrialResult, TIMESTAMP_FORMAT};
use chrono::NaiveDateTime;
use itertools::Itertools;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use unicode_width::UnicodeWidthStr;

/// One point of the speed-over-time chart
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedPoint {
    pub timestamp: NaiveDateTime,
    pub wpm: f64,
}

impl From<&TrialResult> for SpeedPoint {
    fn from(r: &TrialResult) -> Self {
        SpeedPoint {
            timestamp: r.timestamp,
            wpm: r.speed,
        }
    }
}

/// The most recent `n` speeds, oldest first
pub fn recent_speeds(history: &[TrialResult], n: usize) -> Vec<SpeedPoint> {
    let skip = history.len().saturating_sub(n);
    history[skip..].iter().map(SpeedPoint::from).collect()
}

/// Chart input for `user`, failing when there is nothing to plot
pub fn chart_points(
    user: &str,
    history: &[TrialResult],
    n: usize,
) -> Result<Vec<SpeedPoint>, PresentationError> {
    let points = recent_speeds(history, n);
    if points.is_empty() {
        return Err(PresentationError::NoHistory {
            user: user.to_string(),
        });
    }
    Ok(points)
}

pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Population standard deviation
pub fn std_dev(data: &[f64]) -> Option<f64> {
    let avg = mean(data)?;
    let variance = data.iter().map(|v| (avg - v).powi(2)).sum::<f64>() / data.len() as f64;
    Some(variance.sqrt())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistorySummary {
    pub trials: usize,
    pub mean_speed: f64,
    pub best_speed: f64,
    pub speed_std_dev: f64,
    pub mean_accuracy: f64,
}

impl HistorySummary {
    pub fn from_history(history: &[TrialResult]) -> Option<Self> {
        let speeds: Vec<f64> = history.iter().map(|r| r.speed).collect();
        let accuracies: Vec<f64> = history.iter().map(|r| r.accuracy).collect();

        Some(Self {
            trials: history.len(),
            mean_speed: mean(&speeds)?,
            best_speed: speeds.iter().copied().fold(f64::MIN, f64::max),
            speed_std_dev: std_dev(&speeds)?,
            mean_accuracy: mean(&accuracies)?,
        })
    }
}

const COLUMNS: [(&str, usize); 4] = [
    ("Date & Time", 19),
    ("Speed (WPM)", 11),
    ("Accuracy (%)", 12),
    ("Score", 5),
];

fn rule() -> String {
    format!(
        "+{}+",
        COLUMNS.iter().map(|(_, w)| "-".repeat(w + 2)).join("+")
    )
}

fn row(cells: [String; 4]) -> String {
    let mut padded = cells.iter().zip(COLUMNS.iter()).enumerate().map(|(i, (cell, &(_, w)))| {
        if i == 0 {
            format!(" {cell:<w$} ")
        } else {
            format!(" {cell:>w$} ")
        }
    });
    format!("|{}|", padded.join("|"))
}

/// Tabular text report of a user's whole history
pub fn render_report(user: &str, history: &[TrialResult]) -> Result<String, PresentationError> {
    let summary = HistorySummary::from_history(history).ok_or_else(|| {
        PresentationError::NoHistory {
            user: user.to_string(),
        }
    })?;

    let title = format!("Typing Speed Report for {user}");
    let mut lines = vec![
        title.clone(),
        "=".repeat(title.width()),
        String::new(),
        rule(),
        row(COLUMNS.map(|(name, _)| name.to_string())),
        rule(),
    ];
    lines.extend(history.iter().map(|r| {
        row([
            r.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            format!("{:.2}", r.speed),
            format!("{:.2}", r.accuracy),
            r.score.to_string(),
        ])
    }));
    lines.push(rule());
    lines.push(String::new());
    lines.push(format!(
        "Trials: {}  Average speed: {:.2} WPM  Best speed: {:.2} WPM  Std dev: {:.2}  Average accuracy: {:.2}%",
        summary.trials,
        summary.mean_speed,
        summary.best_speed,
        summary.speed_std_dev,
        summary.mean_accuracy
    ));

    let mut report = lines.join("\n");
    report.push('\n');
    Ok(report)
}

pub fn report_path(dir: &Path, user: &str) -> PathBuf {
    dir.join(format!("{}_typing_report.txt", file_stem(user)))
}

/// Write the report for `user` into `dir`, returning the file written
pub fn export_report(
    dir: &Path,
    user: &str,
    history: &[TrialResult],
) -> Result<PathBuf, PresentationError> {
    let report = render_report(user, history)?;
    let path = report_path(dir, user);

    fs::create_dir_all(dir)
        .and_then(|_| fs::write(&path, report))
        .map_err(|source| PresentationError::Io {
            path: path.clone(),
            source,
        })?;

    info!(user, path = %path.display(), rows = history.len(), "exported report");
    Ok(path)
}
