// Shared fakes for integration tests: an in-memory transport and
// capture/playback backends that never touch real devices.

#![allow(dead_code)]

use async_trait::async_trait;
use audio_demo::audio::playback::HeadlessSession;
use audio_demo::audio::{CaptureSummary, PlaybackSession};
use audio_demo::download::{BodyReader, Transport};
use audio_demo::{CaptureBackend, CaptureSession, MediaError, MediaResult, PlaybackBackend};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Serves one fixed body for every URL.
pub struct MemoryTransport {
    pub body: Vec<u8>,
    /// `None` simulates a server that sends no Content-Length
    pub content_length: Option<u64>,
    /// Fail the read after this many bytes have been served
    pub fail_after: Option<usize>,
    pub status: Option<u16>,
    pub chunk_delay: Option<Duration>,
    pub opens: AtomicUsize,
}

impl MemoryTransport {
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            content_length: Some(body.len() as u64),
            body,
            fail_after: None,
            status: None,
            chunk_delay: None,
            opens: AtomicUsize::new(0),
        }
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn open(&self, _url: &str) -> MediaResult<Box<dyn BodyReader>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = self.status {
            return Err(MediaError::HttpStatus(status));
        }

        Ok(Box::new(MemoryBody {
            body: self.body.clone(),
            content_length: self.content_length,
            fail_after: self.fail_after,
            chunk_delay: self.chunk_delay,
            offset: 0,
        }))
    }
}

struct MemoryBody {
    body: Vec<u8>,
    content_length: Option<u64>,
    fail_after: Option<usize>,
    chunk_delay: Option<Duration>,
    offset: usize,
}

#[async_trait]
impl BodyReader for MemoryBody {
    fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    async fn read_chunk(&mut self, max: usize) -> MediaResult<Option<Vec<u8>>> {
        if let Some(delay) = self.chunk_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(limit) = self.fail_after {
            if self.offset >= limit {
                return Err(MediaError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "connection reset by peer",
                )));
            }
        }
        if self.offset >= self.body.len() {
            return Ok(None);
        }

        let end = (self.offset + max).min(self.body.len());
        let chunk = self.body[self.offset..end].to_vec();
        self.offset = end;
        Ok(Some(chunk))
    }
}

/// Capture backend that writes a small placeholder file and counts calls.
#[derive(Default)]
pub struct FakeCapture {
    pub opens: Arc<AtomicUsize>,
    pub stops: Arc<AtomicUsize>,
    pub fail_stop: bool,
}

impl FakeCapture {
    pub fn failing_stop() -> Self {
        Self {
            fail_stop: true,
            ..Self::default()
        }
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

pub const FAKE_RECORDING: &[u8] = b"RIFF fake recording";

impl CaptureBackend for FakeCapture {
    fn open(&self, output: &Path) -> MediaResult<Box<dyn CaptureSession>> {
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(output, FAKE_RECORDING)?;
        self.opens.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(FakeCaptureSession {
            path: output.to_path_buf(),
            stops: Arc::clone(&self.stops),
            fail: self.fail_stop,
        }))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

struct FakeCaptureSession {
    path: PathBuf,
    stops: Arc<AtomicUsize>,
    fail: bool,
}

impl CaptureSession for FakeCaptureSession {
    fn stop(self: Box<Self>) -> MediaResult<CaptureSummary> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(MediaError::Hardware("stop failed: nothing captured".to_string()));
        }
        Ok(CaptureSummary {
            path: self.path,
            sample_count: 1600,
            duration_ms: 100,
        })
    }
}

/// Playback backend reporting a fixed duration for every file.
pub struct FakePlayback {
    pub duration_ms: u64,
    pub fail: bool,
}

impl FakePlayback {
    pub fn new(duration_ms: u64) -> Self {
        Self {
            duration_ms,
            fail: false,
        }
    }
}

impl PlaybackBackend for FakePlayback {
    fn prepare(&self, path: &Path) -> MediaResult<Box<dyn PlaybackSession>> {
        if self.fail {
            return Err(MediaError::Hardware(format!(
                "cannot open {}",
                path.display()
            )));
        }
        Ok(Box::new(HeadlessSession::new(self.duration_ms)))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Receive events until `done` matches one (inclusive).
pub async fn collect_until<E>(rx: &mut mpsc::UnboundedReceiver<E>, done: impl Fn(&E) -> bool) -> Vec<E> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        let finished = done(&event);
        events.push(event);
        if finished {
            break;
        }
    }
    events
}
