use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::thread;
use tracing::{debug, warn};

/// Something that can play the short countdown cue
pub trait Sound: Send + Sync {
    fn play_alert(&self) -> io::Result<()>;
}

const BEL: u8 = 0x07;

/// Terminal bell. Alerts only queue a ring; the thread that owns the terminal
/// writes them with `ring_pending` so BEL never lands inside a frame.
#[derive(Debug, Clone, Default)]
pub struct TerminalBell {
    pending: Arc<AtomicUsize>,
}

impl TerminalBell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Write every queued ring to `out`, returning how many were written
    pub fn ring_pending<W: Write>(&self, out: &mut W) -> io::Result<usize> {
        let rings = self.pending.swap(0, Ordering::SeqCst);
        if rings > 0 {
            out.write_all(&vec![BEL; rings])?;
            out.flush()?;
        }
        Ok(rings)
    }
}

impl Sound for TerminalBell {
    fn play_alert(&self) -> io::Result<()> {
        self.pending.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl Sound for Silent {
    fn play_alert(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Counts alerts instead of playing them
#[derive(Debug, Clone, Default)]
pub struct RecordingSound {
    played: Arc<AtomicUsize>,
}

impl RecordingSound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> usize {
        self.played.load(Ordering::SeqCst)
    }
}

impl Sound for RecordingSound {
    fn play_alert(&self) -> io::Result<()> {
        self.played.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

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
pub enum SoundKind {
    #[default]
    Bell,
    Silent,
}

impl SoundKind {
    pub fn backend(&self, bell: &TerminalBell) -> Arc<dyn Sound> {
        match self {
            SoundKind::Bell => Arc::new(bell.clone()),
            SoundKind::Silent => Arc::new(Silent),
        }
    }
}

/// Plays alerts off the caller's thread; failures are logged and dropped
#[derive(Clone)]
pub struct AlertPlayer {
    sound: Arc<dyn Sound>,
}

impl AlertPlayer {
    pub fn new(sound: Arc<dyn Sound>) -> Self {
        Self { sound }
    }

    pub fn alert(&self) -> Option<thread::JoinHandle<()>> {
        let sound = Arc::clone(&self.sound);
        let spawned = thread::Builder::new()
            .name("alert".into())
            .spawn(move || {
                if let Err(e) = sound.play_alert() {
                    warn!(error = %e, "alert sound failed");
                }
            });

        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                debug!(error = %e, "could not spawn alert thread");
                None
            }
        }
    }
}

impl std::fmt::Debug for AlertPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertPlayer").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenSpeaker;

    impl Sound for BrokenSpeaker {
        fn play_alert(&self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::NotFound, "no audio device"))
        }
    }

    #[test]
    fn alerts_play_in_the_background() {
        let recorder = RecordingSound::new();
        let player = AlertPlayer::new(Arc::new(recorder.clone()));

        let handles: Vec<_> = (0..3).filter_map(|_| player.alert()).collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(recorder.played(), 3);
    }

    #[test]
    fn sound_failures_are_swallowed() {
        let player = AlertPlayer::new(Arc::new(BrokenSpeaker));
        let handle = player.alert().unwrap();
        assert!(handle.join().is_ok());
    }

    #[test]
    fn silent_backend_never_fails() {
        let bell = TerminalBell::new();
        assert!(SoundKind::Silent.backend(&bell).play_alert().is_ok());
        assert_eq!(bell.pending(), 0);
    }

    #[test]
    fn bell_rings_are_queued_until_written() {
        let bell = TerminalBell::new();
        let player = AlertPlayer::new(SoundKind::Bell.backend(&bell));
        for handle in [player.alert(), player.alert()].into_iter().flatten() {
            handle.join().unwrap();
        }
        assert_eq!(bell.pending(), 2);

        let mut out = Vec::new();
        assert_eq!(bell.ring_pending(&mut out).unwrap(), 2);
        assert_eq!(out, vec![BEL, BEL]);

        out.clear();
        assert_eq!(bell.ring_pending(&mut out).unwrap(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn sound_kind_serde_names() {
        assert_eq!(
            serde_json::to_string(&SoundKind::Silent).unwrap(),
            "\"silent\""
        );
        assert_eq!(SoundKind::default(), SoundKind::Bell);
    }
}
