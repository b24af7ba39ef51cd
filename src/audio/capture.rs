use std::f32::consts::PI;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::backend::{CaptureBackend, CaptureConfig, CaptureSession, CaptureSummary};
use crate::error::{MediaError, MediaResult};

const AMPLITUDE: f32 = 0.25;

/// Capture backend that synthesizes a sine tone in real time and writes it
/// as 16-bit PCM WAV.
///
/// Stands in for a microphone where none is available; timing behaves like a
/// device: samples accumulate at the configured rate while the session runs.
pub struct ToneCapture {
    config: CaptureConfig,
    frequency_hz: f32,
}

impl ToneCapture {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            frequency_hz: 440.0,
        }
    }

    pub fn with_frequency(mut self, frequency_hz: f32) -> Self {
        self.frequency_hz = frequency_hz;
        self
    }
}

impl CaptureBackend for ToneCapture {
    fn open(&self, output: &Path) -> MediaResult<Box<dyn CaptureSession>> {
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }

        let spec = hound::WavSpec {
            channels: self.config.channels,
            sample_rate: self.config.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = hound::WavWriter::create(output, spec).map_err(|e| {
            MediaError::Hardware(format!("failed to open {}: {}", output.display(), e))
        })?;

        let stop = Arc::new(AtomicBool::new(false));
        let generator = ToneGenerator {
            writer,
            stop: Arc::clone(&stop),
            config: self.config.clone(),
            frequency_hz: self.frequency_hz,
        };

        let worker = thread::Builder::new()
            .name("tone-capture".to_string())
            .spawn(move || generator.run())?;

        info!(
            "Tone capture started: {} ({}Hz, {} channels)",
            output.display(),
            self.config.sample_rate,
            self.config.channels
        );

        Ok(Box::new(ToneSession {
            path: output.to_path_buf(),
            stop,
            worker: Some(worker),
            channels: self.config.channels,
            sample_rate: self.config.sample_rate,
            min_capture_ms: self.config.min_capture_ms,
        }))
    }

    fn name(&self) -> &str {
        "tone"
    }
}

struct ToneSession {
    path: PathBuf,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<Result<u64, hound::Error>>>,
    channels: u16,
    sample_rate: u32,
    min_capture_ms: u64,
}

impl CaptureSession for ToneSession {
    fn stop(mut self: Box<Self>) -> MediaResult<CaptureSummary> {
        let worker = self
            .worker
            .take()
            .ok_or_else(|| MediaError::Hardware("capture already stopped".to_string()))?;

        self.stop.store(true, Ordering::SeqCst);
        worker.thread().unpark();

        let frames = worker
            .join()
            .map_err(|_| MediaError::Hardware("capture thread panicked".to_string()))?
            .map_err(|e| MediaError::Hardware(format!("failed to finalize WAV: {}", e)))?;

        let duration_ms = frames * 1000 / self.sample_rate as u64;
        if duration_ms < self.min_capture_ms {
            return Err(MediaError::Hardware(format!(
                "captured {}ms, at least {}ms needed",
                duration_ms, self.min_capture_ms
            )));
        }

        Ok(CaptureSummary {
            path: self.path.clone(),
            sample_count: frames as usize * self.channels as usize,
            duration_ms,
        })
    }
}

impl Drop for ToneSession {
    fn drop(&mut self) {
        // Abandoned without stop(): let the writer thread finalize on its own
        if let Some(worker) = &self.worker {
            self.stop.store(true, Ordering::SeqCst);
            worker.thread().unpark();
        }
    }
}

/// Writes tone frames paced against the wall clock until asked to stop.
struct ToneGenerator {
    writer: hound::WavWriter<BufWriter<File>>,
    stop: Arc<AtomicBool>,
    config: CaptureConfig,
    frequency_hz: f32,
}

impl ToneGenerator {
    fn run(mut self) -> Result<u64, hound::Error> {
        let started = Instant::now();
        let buffer = Duration::from_millis(self.config.buffer_duration_ms);
        let mut written = 0u64;

        loop {
            let stopping = self.stop.load(Ordering::SeqCst);

            let due = started.elapsed().as_millis() as u64 * self.config.sample_rate as u64 / 1000;
            while written < due {
                let t = written as f32 / self.config.sample_rate as f32;
                let value = (2.0 * PI * self.frequency_hz * t).sin() * AMPLITUDE;
                let sample = (value * i16::MAX as f32) as i16;
                for _ in 0..self.config.channels {
                    self.writer.write_sample(sample)?;
                }
                written += 1;
            }

            if stopping {
                break;
            }
            thread::park_timeout(buffer);
        }

        self.writer.finalize()?;
        debug!("Tone capture wrote {} frames", written);
        Ok(written)
    }
}
