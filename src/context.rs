use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(&self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// Process-wide presentation settings.
///
/// Created at launch from config and CLI flags, changed only through the
/// toggles below, dropped at exit. The logged in user belongs to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppContext {
    pub theme: Theme,
    pub sound_enabled: bool,
}

impl Default for AppContext {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            sound_enabled: true,
        }
    }
}

impl AppContext {
    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        self.theme
    }

    pub fn toggle_sound(&mut self) -> bool {
        self.sound_enabled = !self.sound_enabled;
        self.sound_enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggles_flip_and_report_new_state() {
        let mut ctx = AppContext::default();

        assert_eq!(ctx.toggle_theme(), Theme::Dark);
        assert_eq!(ctx.toggle_theme(), Theme::Light);
        assert!(!ctx.toggle_sound());
        assert!(ctx.toggle_sound());
    }
}
