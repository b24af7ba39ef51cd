use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::player::Player;
use super::recorder::Recorder;
use crate::audio::{CaptureBackend, PlaybackBackend};
use crate::config::Config;
use crate::download::{DownloadHandle, Downloader, Transport};
use crate::error::{MediaError, MediaResult};
use crate::events::{DownloadEvent, EventSink, PlayEvent, RecordEvent};
use crate::storage::StorageLayout;

/// Entry point for the application: owns at most one recorder, one player
/// and one downloader, and keeps recording and playback mutually exclusive.
///
/// Each component is set up once with its `with_*` call; using a component
/// that was never set up fails with `MediaError::Configuration`.
pub struct MediaSessionController {
    config: Config,
    storage: StorageLayout,
    recorder: Option<Recorder>,
    player: Option<Player>,
    downloader: Option<Downloader>,
}

impl MediaSessionController {
    pub fn new(config: Config) -> Self {
        let storage = StorageLayout::new(&config.storage);
        Self::with_storage(config, storage)
    }

    pub fn with_storage(config: Config, storage: StorageLayout) -> Self {
        Self {
            config,
            storage,
            recorder: None,
            player: None,
            downloader: None,
        }
    }

    pub fn with_recorder(
        mut self,
        backend: Arc<dyn CaptureBackend>,
        events: EventSink<RecordEvent>,
    ) -> Self {
        self.recorder = Some(Recorder::new(
            backend,
            self.storage.recording_path(),
            &self.config.recorder,
            events,
        ));
        self
    }

    pub fn with_player(
        mut self,
        backend: Arc<dyn PlaybackBackend>,
        events: EventSink<PlayEvent>,
    ) -> Self {
        self.player = Some(Player::new(backend, &self.config.player, events));
        self
    }

    pub fn with_downloader(mut self, transport: Arc<dyn Transport>) -> Self {
        self.downloader = Some(
            Downloader::new(transport, self.storage.clone())
                .with_chunk_size(self.config.download.chunk_size),
        );
        self
    }

    pub fn storage(&self) -> &StorageLayout {
        &self.storage
    }

    pub fn recorder(&self) -> MediaResult<&Recorder> {
        self.recorder
            .as_ref()
            .ok_or_else(|| MediaError::not_initialized("recorder", "with_recorder"))
    }

    pub fn player(&self) -> MediaResult<&Player> {
        self.player
            .as_ref()
            .ok_or_else(|| MediaError::not_initialized("player", "with_player"))
    }

    pub fn downloader(&self) -> MediaResult<&Downloader> {
        self.downloader
            .as_ref()
            .ok_or_else(|| MediaError::not_initialized("downloader", "with_downloader"))
    }

    pub fn start_download(
        &self,
        url: &str,
        events: EventSink<DownloadEvent>,
    ) -> MediaResult<DownloadHandle> {
        Ok(self.downloader()?.start_download(url, events))
    }

    /// Stops any playback, then starts recording.
    pub fn start_recording(&self) -> MediaResult<()> {
        let recorder = self.recorder()?;

        if let Some(player) = &self.player {
            if !player.is_stopped() {
                info!("Stopping playback before recording");
                player.stop();
            }
        }

        recorder.start()
    }

    pub fn stop_recording(&self) -> MediaResult<()> {
        self.recorder()?.stop();
        Ok(())
    }

    /// Finishes any active recording (including its debounced teardown),
    /// then plays `path`.
    pub async fn start_playing(&self, path: impl AsRef<Path>) -> MediaResult<()> {
        let player = self.player()?;

        if let Some(recorder) = &self.recorder {
            if recorder.is_recording() {
                info!("Stopping recording before playback");
                recorder.stop_and_wait().await;
            }
        }

        player.start(path);
        Ok(())
    }

    pub async fn start_playing_recorded_file(&self) -> MediaResult<()> {
        let recorder = self.recorder()?;
        self.start_playing(recorder.output_path()).await
    }

    pub fn stop_playing(&self) -> MediaResult<()> {
        self.player()?.stop();
        Ok(())
    }

    pub fn pause_playing(&self) -> MediaResult<()> {
        self.player()?.pause();
        Ok(())
    }

    pub fn resume_playing(&self) -> MediaResult<()> {
        self.player()?.resume();
        Ok(())
    }

    /// Releases every handle on the recording, then removes it.
    pub async fn delete_recorded_file(&self) -> MediaResult<bool> {
        let recorder = self.recorder()?;

        if let Some(player) = &self.player {
            if !player.is_stopped() {
                player.stop();
            }
        }
        if recorder.is_recording() {
            recorder.stop_and_wait().await;
        }

        Ok(recorder.delete())
    }

    pub fn export_recording(&self) -> MediaResult<String> {
        self.recorder()?.export_encoded()
    }

    /// Remove downloads older than the configured age.
    pub fn cleanup_downloads(&self) -> MediaResult<usize> {
        Ok(self
            .storage
            .cleanup(self.config.download.cleanup_max_age())?)
    }
}
