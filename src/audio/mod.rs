pub mod backend;
pub mod capture;
pub mod file;
pub mod playback;

pub use backend::{
    AudioBackendFactory, CaptureBackend, CaptureConfig, CaptureSession, CaptureSummary,
    PlaybackBackend, PlaybackSession,
};
pub use capture::ToneCapture;
pub use file::AudioFile;
pub use playback::HeadlessPlayback;
