use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the download, recording and playback components.
///
/// `Io`, `Transport` and `HttpStatus` together form the I/O failure class
/// (see [`MediaError::is_io_failure`]). `Configuration` is a precondition
/// violation and is always returned synchronously.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("no recording found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("{component} is not initialized: call {init}() first")]
    Configuration {
        component: &'static str,
        init: &'static str,
    },

    #[error("storage failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("network request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned an unsuccessful status code: {0}")]
    HttpStatus(u16),

    #[error("audio device failure: {0}")]
    Hardware(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl MediaError {
    pub(crate) fn not_initialized(component: &'static str, init: &'static str) -> Self {
        Self::Configuration { component, init }
    }

    /// True for network and storage failures.
    pub fn is_io_failure(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Transport(_) | Self::HttpStatus(_))
    }
}

pub type MediaResult<T> = std::result::Result<T, MediaError>;
