use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::info;

/// Stream properties of a local audio file, read from its container headers.
#[derive(Debug, Clone)]
pub struct AudioFile {
    pub path: String,
    pub duration_ms: u64,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFile {
    pub fn probe(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Probing audio file: {}", path.display());

        let file = File::open(path)
            .with_context(|| format!("Failed to open audio file: {}", path.display()))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .context("Unsupported or corrupt audio container")?;

        let track = probed
            .format
            .default_track()
            .context("Audio file has no playable track")?;
        let params = &track.codec_params;

        let sample_rate = params.sample_rate.context("Track has no sample rate")?;
        let frames = params.n_frames.context("Track length is unknown")?;
        let channels = params.channels.map(|c| c.count() as u16).unwrap_or(1);
        let duration_ms = frames * 1000 / sample_rate as u64;

        info!(
            "Audio file probed: {}ms, {}Hz, {} channels",
            duration_ms, sample_rate, channels
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_ms,
            sample_rate,
            channels,
        })
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_ms as f64 / 1000.0
    }
}
