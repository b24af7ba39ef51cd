use base64::Engine;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::audio::{CaptureBackend, CaptureSession};
use crate::clock::{ClockHandle, ProgressClock};
use crate::config::{MaxDuration, RecorderConfig};
use crate::error::{MediaError, MediaResult};
use crate::events::{EventSink, MediaOperation, OperationStatus, ProgressSample, RecordEvent};
use crate::utils::lock;

/// Progress of a recording at tick `tick` of a clock running every
/// `interval_ms`, bounded by `max_duration_ms`.
pub fn record_progress(tick: u64, interval_ms: u64, max_duration_ms: u64) -> ProgressSample {
    let max_secs = (max_duration_ms / 1000).max(1);
    let elapsed_ms = tick * interval_ms;
    let elapsed = elapsed_ms / 1000;

    ProgressSample {
        elapsed_secs: elapsed as u32,
        remaining_secs: max_secs.saturating_sub(elapsed) as u32,
        percent: (elapsed_ms / (max_secs * 10)) as u32,
    }
}

/// Drives one capture session at a time, bounded by a maximum duration.
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct Recorder {
    shared: Arc<Shared>,
}

struct Shared {
    backend: Arc<dyn CaptureBackend>,
    output: PathBuf,
    clock: ProgressClock,
    stop_debounce: Duration,
    events: EventSink<RecordEvent>,
    recording: watch::Sender<bool>,
    state: Mutex<RecorderState>,
}

struct RecorderState {
    session: Option<Box<dyn CaptureSession>>,
    operation: Option<MediaOperation>,
    progress: Option<ClockHandle>,
    pending_stop: Option<JoinHandle<()>>,
    /// Bumped by every start/stop request; a scheduled teardown only runs
    /// if nothing happened since it was scheduled.
    stop_generation: u64,
    max_duration_ms: u64,
}

impl Recorder {
    pub fn new(
        backend: Arc<dyn CaptureBackend>,
        output: impl Into<PathBuf>,
        config: &RecorderConfig,
        events: EventSink<RecordEvent>,
    ) -> Self {
        let (recording, _) = watch::channel(false);

        Self {
            shared: Arc::new(Shared {
                backend,
                output: output.into(),
                clock: ProgressClock::new(config.tick_interval()),
                stop_debounce: config.stop_debounce(),
                events,
                recording,
                state: Mutex::new(RecorderState {
                    session: None,
                    operation: None,
                    progress: None,
                    pending_stop: None,
                    stop_generation: 0,
                    max_duration_ms: config.max_duration_ms,
                }),
            }),
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.shared.output
    }

    /// Applies to the next recording.
    pub fn set_max_duration(&self, preset: MaxDuration) {
        lock(&self.shared.state).max_duration_ms = preset.as_millis();
    }

    pub fn max_duration_ms(&self) -> u64 {
        lock(&self.shared.state).max_duration_ms
    }

    pub fn is_recording(&self) -> bool {
        lock(&self.shared.state).session.is_some()
    }

    pub fn operation(&self) -> Option<MediaOperation> {
        lock(&self.shared.state).operation.clone()
    }

    /// Begin capturing. Cancels a pending debounced stop; if a session is
    /// already running it simply keeps going. A session that has reached its
    /// maximum duration is not revived: its stop stays scheduled.
    pub fn start(&self) -> MediaResult<()> {
        let mut state = lock(&self.shared.state);

        let timed_out = state.session.is_some()
            && state.progress.as_ref().map_or(true, ClockHandle::is_finished);
        if timed_out {
            debug!("Recording already reached its maximum duration");
            return Ok(());
        }

        state.stop_generation += 1;
        if let Some(pending) = state.pending_stop.take() {
            pending.abort();
            debug!("Pending recorder stop cancelled");
            if let Some(operation) = state.operation.as_mut() {
                operation.status = OperationStatus::Active;
            }
        }

        if state.session.is_some() {
            return Ok(());
        }

        let session = self.shared.backend.open(&self.shared.output).map_err(|e| {
            error!("Failed to open {} capture: {}", self.shared.backend.name(), e);
            e
        })?;

        let mut operation = MediaOperation::new(self.shared.output.display().to_string());
        operation.status = OperationStatus::Active;
        let operation_id = operation.id;
        let max_duration_ms = state.max_duration_ms;

        state.session = Some(session);
        state.operation = Some(operation);

        info!(
            "Recording {} started: {} (max {}ms)",
            operation_id,
            self.shared.output.display(),
            max_duration_ms
        );
        let _ = self.shared.events.send(RecordEvent::Started);
        self.shared.recording.send_replace(true);

        state.progress = Some(self.spawn_progress(operation_id, max_duration_ms));
        Ok(())
    }

    fn spawn_progress(&self, operation_id: Uuid, max_duration_ms: u64) -> ClockHandle {
        let interval_ms = self.shared.clock.interval().as_millis().max(1) as u64;
        let limit = max_duration_ms / interval_ms;
        let on_tick_shared = Arc::downgrade(&self.shared);
        let on_complete_shared = Arc::downgrade(&self.shared);

        self.shared.clock.spawn(
            limit,
            move |tick| {
                let Some(shared) = on_tick_shared.upgrade() else {
                    return ControlFlow::Break(());
                };
                let state = lock(&shared.state);
                if !state.owns(operation_id) {
                    return ControlFlow::Break(());
                }

                let sample = record_progress(tick, interval_ms, max_duration_ms);
                let _ = shared.events.send(RecordEvent::Progress(sample));
                ControlFlow::Continue(())
            },
            move || {
                if let Some(shared) = on_complete_shared.upgrade() {
                    info!("Recording {} reached its maximum duration", operation_id);
                    Recorder { shared }.stop_operation(Some(operation_id));
                }
            },
        )
    }

    /// Request a stop. The capture session is torn down after the debounce
    /// delay; another `stop()` reschedules it and `start()` cancels it.
    pub fn stop(&self) {
        self.stop_operation(None);
    }

    fn stop_operation(&self, operation_id: Option<Uuid>) {
        let mut state = lock(&self.shared.state);
        if state.session.is_none() {
            return;
        }
        if let Some(id) = operation_id {
            if !state.owns(id) {
                return;
            }
        }

        state.stop_generation += 1;
        let generation = state.stop_generation;
        if let Some(pending) = state.pending_stop.take() {
            pending.abort();
        }
        if let Some(operation) = state.operation.as_mut() {
            operation.status = OperationStatus::Stopping;
        }

        let shared = Arc::downgrade(&self.shared);
        let delay = self.shared.stop_debounce;
        state.pending_stop = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            teardown(&shared, generation);
        }));
    }

    /// Stop and wait until the capture session has been torn down.
    pub async fn stop_and_wait(&self) {
        let mut recording = self.shared.recording.subscribe();
        self.stop();
        let _ = recording.wait_for(|active| !*active).await;
    }

    /// Remove the recording file. Returns whether a file was removed.
    pub fn delete(&self) -> bool {
        match std::fs::remove_file(&self.shared.output) {
            Ok(()) => {
                info!("Deleted recording {}", self.shared.output.display());
                true
            }
            Err(e) => {
                debug!("Could not delete {}: {}", self.shared.output.display(), e);
                false
            }
        }
    }

    /// The recorded file as standard base64, without any wrapper.
    pub fn export_encoded(&self) -> MediaResult<String> {
        let path = &self.shared.output;
        if !path.exists() {
            return Err(MediaError::NotFound(path.clone()));
        }

        let bytes = std::fs::read(path)?;
        Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
    }
}

impl RecorderState {
    fn owns(&self, operation_id: Uuid) -> bool {
        self.session.is_some() && self.operation.as_ref().map(|o| o.id) == Some(operation_id)
    }
}

fn teardown(shared: &Weak<Shared>, generation: u64) {
    let Some(shared) = shared.upgrade() else {
        return;
    };
    let mut state = lock(&shared.state);

    if state.stop_generation != generation {
        debug!("Skipping superseded recorder teardown");
        return;
    }
    state.pending_stop = None;

    let Some(session) = state.session.take() else {
        return;
    };
    if let Some(progress) = state.progress.take() {
        progress.cancel();
    }

    // A session stopped before enough audio arrived fails to finalize;
    // that ends the recording unsuccessfully rather than erroring out.
    // Stopping blocks only until the capture worker wakes and flushes its
    // last buffer; the lock is held so no new session can open the file
    // while it is being finalized.
    let success = match session.stop() {
        Ok(summary) => {
            info!(
                "Recording saved: {} ({}ms, {} samples)",
                summary.path.display(),
                summary.duration_ms,
                summary.sample_count
            );
            true
        }
        Err(e) => {
            warn!("Recording stopped without a usable file: {}", e);
            false
        }
    };

    state.operation = None;
    let _ = shared.events.send(RecordEvent::Stopped { success });
    shared.recording.send_replace(false);
}
