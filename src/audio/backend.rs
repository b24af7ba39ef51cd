use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::capture::ToneCapture;
use super::playback::HeadlessPlayback;
use crate::error::MediaResult;

/// Configuration for capture backends
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Output channel count (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Write granularity in milliseconds
    pub buffer_duration_ms: u64,
    /// Sessions shorter than this cannot be finalized
    pub min_capture_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            buffer_duration_ms: 100,
            min_capture_ms: 100,
        }
    }
}

/// What a finished capture session produced
#[derive(Debug, Clone)]
pub struct CaptureSummary {
    pub path: PathBuf,
    pub sample_count: usize,
    pub duration_ms: u64,
}

/// Audio capture backend trait
///
/// A backend opens at most one session per call; the session owns the device
/// handle until [`CaptureSession::stop`] consumes it.
pub trait CaptureBackend: Send + Sync {
    /// Open a capture session writing to `output` and begin capturing.
    fn open(&self, output: &Path) -> MediaResult<Box<dyn CaptureSession>>;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// A live capture session.
pub trait CaptureSession: Send {
    /// Stop capturing and release the device. Fails with
    /// `MediaError::Hardware` when too little audio was captured to finalize.
    fn stop(self: Box<Self>) -> MediaResult<CaptureSummary>;
}

/// Audio playback backend trait
pub trait PlaybackBackend: Send + Sync {
    /// Prepare `path` for playback. May block while the source is opened and
    /// probed, so callers run it off the async runtime.
    fn prepare(&self, path: &Path) -> MediaResult<Box<dyn PlaybackSession>>;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// A prepared playback session.
pub trait PlaybackSession: Send {
    fn start(&mut self);

    fn pause(&mut self);

    fn stop(&mut self);

    fn is_playing(&self) -> bool;

    /// Current play-head position
    fn position_ms(&self) -> u64;

    fn duration_ms(&self) -> u64;
}

/// Audio backend factory
pub struct AudioBackendFactory;

impl AudioBackendFactory {
    /// Create the capture backend for this platform
    pub fn capture(config: CaptureConfig) -> Arc<dyn CaptureBackend> {
        Arc::new(ToneCapture::new(config))
    }

    /// Create the playback backend for this platform
    pub fn playback() -> Arc<dyn PlaybackBackend> {
        Arc::new(HeadlessPlayback::new())
    }
}
