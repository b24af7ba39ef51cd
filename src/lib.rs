pub mod audio;
pub mod clock;
pub mod config;
pub mod download;
pub mod error;
pub mod events;
pub mod media;
pub mod storage;

mod utils;

pub use audio::{
    AudioBackendFactory, AudioFile, CaptureBackend, CaptureConfig, CaptureSession,
    PlaybackBackend, PlaybackSession,
};
pub use clock::{ClockHandle, ProgressClock};
pub use config::{Config, MaxDuration};
pub use download::{DownloadHandle, Downloader, HttpTransport, Transport};
pub use error::{MediaError, MediaResult};
pub use events::{
    event_channel, DownloadEvent, DownloadResult, EventSink, EventStream, MediaOperation,
    OperationStatus, PlayEvent, ProgressSample, RecordEvent,
};
pub use media::{MediaSessionController, PlayState, Player, Recorder};
pub use storage::StorageLayout;
