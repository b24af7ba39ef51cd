use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

use crate::config::StorageConfig;

/// On-disk locations for downloaded audio and the current recording.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    audio_dir: PathBuf,
    files_dir: PathBuf,
    recording_file: String,
}

impl StorageLayout {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            audio_dir: config.audio_dir.clone(),
            files_dir: config.files_dir.clone(),
            recording_file: config.recording_file.clone(),
        }
    }

    /// Layout rooted at a single directory: `<root>/audio` and `<root>/files`.
    pub fn rooted(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            audio_dir: root.join("audio"),
            files_dir: root.join("files"),
            recording_file: StorageConfig::default().recording_file,
        }
    }

    pub fn audio_dir(&self) -> &Path {
        &self.audio_dir
    }

    /// Local destination for a remote file: the base name of the URL path
    /// with its extension stripped.
    pub fn download_path(&self, url: &str) -> PathBuf {
        self.audio_dir.join(base_name(url))
    }

    pub fn recording_path(&self) -> PathBuf {
        self.files_dir.join(&self.recording_file)
    }

    /// Remove regular files in the audio directory last modified more than
    /// `max_age` ago. Returns how many files were removed.
    pub fn cleanup(&self, max_age: Duration) -> io::Result<usize> {
        let entries = match fs::read_dir(&self.audio_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No audio directory at {}", self.audio_dir.display());
                return Ok(0);
            }
            Err(e) => return Err(e),
        };

        let now = SystemTime::now();
        let mut removed = 0;

        for entry in entries {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }

            let age = now
                .duration_since(metadata.modified()?)
                .unwrap_or(Duration::ZERO);
            if age > max_age {
                debug!("Removing {} (age {}s)", entry.path().display(), age.as_secs());
                fs::remove_file(entry.path())?;
                removed += 1;
            }
        }

        info!("Cleanup removed {} stale audio files", removed);
        Ok(removed)
    }
}

/// Fallback name when a URL carries neither a path segment nor a host
const FALLBACK_NAME: &str = "download";

fn base_name(url: &str) -> String {
    let parsed = reqwest::Url::parse(url).ok();
    let path = match &parsed {
        Some(parsed) => parsed.path(),
        None => url,
    };

    // Trailing slashes are ignored, as with a POSIX basename
    let stem = path
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .and_then(|segment| Path::new(segment).file_stem())
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty());

    stem.or_else(|| parsed.as_ref().and_then(|u| u.host_str()).map(str::to_string))
        .unwrap_or_else(|| FALLBACK_NAME.to_string())
}
