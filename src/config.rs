use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub recorder: RecorderConfig,
    pub player: PlayerConfig,
    pub download: DownloadConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Downloaded files land here
    pub audio_dir: PathBuf,
    /// Per-install directory holding the current recording
    pub files_dir: PathBuf,
    pub recording_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            audio_dir: PathBuf::from("AudioDemo/audio"),
            files_dir: PathBuf::from("AudioDemo/files"),
            recording_file: "current.wav".to_string(),
        }
    }
}

/// Recording length presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxDuration {
    /// 12 seconds
    Short,
    /// 30 seconds
    Long,
}

impl MaxDuration {
    pub fn as_millis(self) -> u64 {
        match self {
            MaxDuration::Short => 12_000,
            MaxDuration::Long => 30_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    pub max_duration_ms: u64,
    /// Delay between a stop request and the capture session teardown
    pub stop_debounce_ms: u64,
    pub tick_interval_ms: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            max_duration_ms: MaxDuration::Short.as_millis(),
            stop_debounce_ms: 200,
            tick_interval_ms: 100,
        }
    }
}

impl RecorderConfig {
    pub fn with_max_duration(mut self, preset: MaxDuration) -> Self {
        self.max_duration_ms = preset.as_millis();
        self
    }

    pub fn stop_debounce(&self) -> Duration {
        Duration::from_millis(self.stop_debounce_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub tick_interval_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
        }
    }
}

impl PlayerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Bytes requested from the response body per read
    pub chunk_size: usize,
    pub cleanup_max_age_hours: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2048,
            cleanup_max_age_hours: 24,
        }
    }
}

impl DownloadConfig {
    pub fn cleanup_max_age(&self) -> Duration {
        Duration::from_secs(self.cleanup_max_age_hours * 3600)
    }
}

impl Config {
    /// Load settings from an optional file at `path` (any extension the
    /// `config` crate understands), overridden by `AUDIO_DEMO__*` variables.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("AUDIO_DEMO").separator("__"))
            .build()
            .with_context(|| format!("Failed to read config from {}", path))?;

        settings
            .try_deserialize()
            .context("Failed to deserialize config")
    }
}
