use serde::Serialize;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::audio::{PlaybackBackend, PlaybackSession};
use crate::clock::{ClockHandle, ProgressClock};
use crate::config::PlayerConfig;
use crate::error::{MediaError, MediaResult};
use crate::events::{EventSink, MediaOperation, OperationStatus, PlayEvent, ProgressSample};
use crate::utils::lock;

/// Playback state machine:
///
/// ```text
/// Stopped ──start──▶ Preparing ──prepared──▶ Playing ◀──resume── Paused
///                                              │ ──pause──────────▶ │
///    ▲──────────── stop / reached 100% ────────┴────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlayState {
    Stopped,
    Preparing,
    Playing,
    Paused,
}

pub fn play_progress(position_ms: u64, duration_ms: u64) -> ProgressSample {
    let duration_ms = duration_ms.max(1);
    let position_ms = position_ms.min(duration_ms);

    ProgressSample {
        elapsed_secs: (position_ms / 1000) as u32,
        remaining_secs: ((duration_ms - position_ms) / 1000) as u32,
        percent: (position_ms * 100 / duration_ms) as u32,
    }
}

/// Plays one local file at a time and reports its progress.
///
/// Cheap to clone; clones control the same playback.
#[derive(Clone)]
pub struct Player {
    shared: Arc<Shared>,
}

struct Shared {
    backend: Arc<dyn PlaybackBackend>,
    clock: ProgressClock,
    events: EventSink<PlayEvent>,
    state: Mutex<PlayerState>,
}

struct PlayerState {
    play_state: PlayState,
    path: Option<PathBuf>,
    session: Option<Box<dyn PlaybackSession>>,
    operation: Option<MediaOperation>,
    progress: Option<ClockHandle>,
    preparing: Option<JoinHandle<()>>,
}

impl PlayerState {
    fn owns(&self, operation_id: Uuid) -> bool {
        self.operation.as_ref().map(|o| o.id) == Some(operation_id)
    }

    fn set_status(&mut self, status: OperationStatus) {
        if let Some(operation) = self.operation.as_mut() {
            operation.status = status;
        }
    }
}

impl Player {
    pub fn new(
        backend: Arc<dyn PlaybackBackend>,
        config: &PlayerConfig,
        events: EventSink<PlayEvent>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                backend,
                clock: ProgressClock::new(config.tick_interval()),
                events,
                state: Mutex::new(PlayerState {
                    play_state: PlayState::Stopped,
                    path: None,
                    session: None,
                    operation: None,
                    progress: None,
                    preparing: None,
                }),
            }),
        }
    }

    pub fn state(&self) -> PlayState {
        lock(&self.shared.state).play_state
    }

    pub fn is_playing(&self) -> bool {
        self.state() == PlayState::Playing
    }

    pub fn is_paused(&self) -> bool {
        self.state() == PlayState::Paused
    }

    pub fn is_stopped(&self) -> bool {
        self.state() == PlayState::Stopped
    }

    pub fn current_path(&self) -> Option<PathBuf> {
        lock(&self.shared.state).path.clone()
    }

    pub fn operation(&self) -> Option<MediaOperation> {
        lock(&self.shared.state).operation.clone()
    }

    /// Start playing `path`.
    ///
    /// A no-op if `path` is already playing or being prepared; any other
    /// playback is stopped first. Playback begins once the source is ready.
    pub fn start(&self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        let mut state = lock(&self.shared.state);

        if matches!(state.play_state, PlayState::Playing | PlayState::Preparing)
            && state.path.as_deref() == Some(path.as_path())
        {
            debug!("Already playing {}", path.display());
            return;
        }
        if state.play_state != PlayState::Stopped {
            self.shared.stop_locked(&mut state);
        }

        let operation = MediaOperation::new(path.display().to_string());
        let operation_id = operation.id;
        info!("Preparing playback {}: {}", operation_id, path.display());

        state.play_state = PlayState::Preparing;
        state.path = Some(path.clone());
        state.operation = Some(operation);

        let backend = Arc::clone(&self.shared.backend);
        let shared = Arc::downgrade(&self.shared);

        state.preparing = Some(tokio::spawn(async move {
            let source = path.clone();
            let prepared = tokio::task::spawn_blocking(move || backend.prepare(&source))
                .await
                .unwrap_or_else(|e| Err(MediaError::Hardware(format!("prepare task failed: {}", e))));

            if let Some(shared) = shared.upgrade() {
                Player { shared }.on_prepared(operation_id, path, prepared);
            }
        }));
    }

    fn on_prepared(
        &self,
        operation_id: Uuid,
        path: PathBuf,
        prepared: MediaResult<Box<dyn PlaybackSession>>,
    ) {
        let mut state = lock(&self.shared.state);
        if !state.owns(operation_id) || state.play_state != PlayState::Preparing {
            debug!("Discarding superseded preparation of {}", path.display());
            return;
        }
        state.preparing = None;

        match prepared {
            Ok(mut session) => {
                session.start();
                let duration_ms = session.duration_ms();
                info!("Playing {} ({}ms)", path.display(), duration_ms);

                state.session = Some(session);
                state.play_state = PlayState::Playing;
                state.set_status(OperationStatus::Active);

                let _ = self.shared.events.send(PlayEvent::Started { path });
                state.progress = Some(self.spawn_progress(operation_id, duration_ms));
            }
            Err(e) => {
                error!("Failed to prepare {}: {}", path.display(), e);
                state.play_state = PlayState::Stopped;
                state.path = None;
                state.operation = None;
                let _ = self.shared.events.send(PlayEvent::Error {
                    path,
                    cause: Arc::new(e),
                });
            }
        }
    }

    fn spawn_progress(&self, operation_id: Uuid, duration_ms: u64) -> ClockHandle {
        let interval_ms = self.shared.clock.interval().as_millis().max(1) as u64;
        let on_tick_shared = Arc::downgrade(&self.shared);
        let on_complete_shared = Arc::downgrade(&self.shared);

        self.shared.clock.spawn(
            duration_ms / interval_ms,
            move |_tick| {
                let Some(shared) = on_tick_shared.upgrade() else {
                    return ControlFlow::Break(());
                };
                let mut state = lock(&shared.state);
                if !state.owns(operation_id) || state.play_state != PlayState::Playing {
                    return ControlFlow::Break(());
                }
                let Some(session) = state.session.as_ref() else {
                    return ControlFlow::Break(());
                };

                let sample = play_progress(session.position_ms(), session.duration_ms());
                let _ = shared.events.send(PlayEvent::Progress(sample));

                if sample.percent >= 100 {
                    shared.stop_locked(&mut state);
                    return ControlFlow::Break(());
                }
                ControlFlow::Continue(())
            },
            move || {
                if let Some(shared) = on_complete_shared.upgrade() {
                    let mut state = lock(&shared.state);
                    if state.owns(operation_id) && state.play_state == PlayState::Playing {
                        shared.stop_locked(&mut state);
                    }
                }
            },
        )
    }

    pub fn stop(&self) {
        let mut state = lock(&self.shared.state);
        self.shared.stop_locked(&mut state);
    }

    /// Suspend playback and progress. Only valid while playing.
    pub fn pause(&self) {
        let mut state = lock(&self.shared.state);
        if state.play_state != PlayState::Playing {
            warn!("pause() ignored in state {:?}", state.play_state);
            return;
        }

        if let Some(progress) = state.progress.take() {
            progress.cancel();
        }
        if let Some(session) = state.session.as_mut() {
            session.pause();
        }
        state.play_state = PlayState::Paused;
        state.set_status(OperationStatus::Paused);

        if let Some(path) = state.path.clone() {
            info!("Paused {}", path.display());
            let _ = self.shared.events.send(PlayEvent::Paused { path });
        }
    }

    /// Continue a paused playback. Only valid while paused.
    pub fn resume(&self) {
        let mut state = lock(&self.shared.state);
        if state.play_state != PlayState::Paused {
            warn!("resume() ignored in state {:?}", state.play_state);
            return;
        }
        let Some(operation_id) = state.operation.as_ref().map(|o| o.id) else {
            return;
        };

        let duration_ms = match state.session.as_mut() {
            Some(session) => {
                session.start();
                session.duration_ms()
            }
            None => return,
        };
        state.play_state = PlayState::Playing;
        state.set_status(OperationStatus::Active);

        if let Some(path) = state.path.clone() {
            info!("Resumed {}", path.display());
            let _ = self.shared.events.send(PlayEvent::Resumed { path });
        }
        state.progress = Some(self.spawn_progress(operation_id, duration_ms));
    }
}

impl Shared {
    fn stop_locked(&self, state: &mut PlayerState) {
        if state.play_state == PlayState::Stopped {
            return;
        }

        if let Some(preparing) = state.preparing.take() {
            preparing.abort();
        }
        if let Some(progress) = state.progress.take() {
            progress.cancel();
        }
        if let Some(mut session) = state.session.take() {
            session.stop();
        }

        state.play_state = PlayState::Stopped;
        state.operation = None;

        if let Some(path) = state.path.take() {
            info!("Stopped {}", path.display());
            let _ = self.events.send(PlayEvent::Stopped { path });
        }
    }
}
