use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use super::backend::{PlaybackBackend, PlaybackSession};
use super::file::AudioFile;
use crate::error::{MediaError, MediaResult};

/// Playback backend without an output device: the file is probed for its
/// duration and a play-head advances on the tokio clock.
#[derive(Debug, Default)]
pub struct HeadlessPlayback;

impl HeadlessPlayback {
    pub fn new() -> Self {
        Self
    }
}

impl PlaybackBackend for HeadlessPlayback {
    fn prepare(&self, path: &Path) -> MediaResult<Box<dyn PlaybackSession>> {
        let file = AudioFile::probe(path).map_err(|e| MediaError::Hardware(format!("{:#}", e)))?;
        if file.duration_ms == 0 {
            return Err(MediaError::Hardware(format!(
                "{} contains no audio",
                path.display()
            )));
        }

        Ok(Box::new(HeadlessSession::new(file.duration_ms)))
    }

    fn name(&self) -> &str {
        "headless"
    }
}

/// Play-head over a media timeline of known length.
#[derive(Debug)]
pub struct HeadlessSession {
    duration_ms: u64,
    played: Duration,
    resumed_at: Option<Instant>,
}

impl HeadlessSession {
    pub fn new(duration_ms: u64) -> Self {
        Self {
            duration_ms,
            played: Duration::ZERO,
            resumed_at: None,
        }
    }

    fn elapsed(&self) -> Duration {
        match self.resumed_at {
            Some(at) => self.played + at.elapsed(),
            None => self.played,
        }
    }
}

impl PlaybackSession for HeadlessSession {
    fn start(&mut self) {
        if self.resumed_at.is_none() {
            self.resumed_at = Some(Instant::now());
        }
    }

    fn pause(&mut self) {
        self.played = self.elapsed();
        self.resumed_at = None;
        debug!("Paused at {}ms", self.position_ms());
    }

    fn stop(&mut self) {
        self.played = Duration::ZERO;
        self.resumed_at = None;
    }

    fn is_playing(&self) -> bool {
        self.resumed_at.is_some()
    }

    fn position_ms(&self) -> u64 {
        (self.elapsed().as_millis() as u64).min(self.duration_ms)
    }

    fn duration_ms(&self) -> u64 {
        self.duration_ms
    }
}
