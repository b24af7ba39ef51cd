use anyhow::{Context, Result};
use audio_demo::{
    event_channel, AudioBackendFactory, CaptureConfig, Config, DownloadEvent, HttpTransport,
    MaxDuration, MediaSessionController, PlayEvent, RecordEvent,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "audio-demo", version, about = "Record, play and download audio clips")]
struct Cli {
    /// Config file (extension optional)
    #[arg(long, default_value = "config/audio-demo")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Download a remote audio file into the audio directory
    Download { url: String },
    /// Record until the maximum duration (or --stop-after) is reached
    Record {
        /// Use the 30 second preset instead of 12 seconds
        #[arg(long)]
        long: bool,
        /// Stop manually after this many seconds
        #[arg(long)]
        stop_after: Option<u64>,
    },
    /// Play a local audio file
    Play { path: PathBuf },
    /// Play the current recording
    PlayRecording,
    /// Print the current recording as base64
    Export,
    /// Delete the current recording
    Delete,
    /// Remove stale downloads
    Cleanup,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("Audio demo v{}", env!("CARGO_PKG_VERSION"));
    info!("Audio directory: {}", cfg.storage.audio_dir.display());

    let (record_tx, mut record_rx) = event_channel();
    let (play_tx, mut play_rx) = event_channel();

    let controller = MediaSessionController::new(cfg)
        .with_recorder(AudioBackendFactory::capture(CaptureConfig::default()), record_tx)
        .with_player(AudioBackendFactory::playback(), play_tx)
        .with_downloader(Arc::new(HttpTransport::new()));

    match cli.command {
        Command::Download { url } => {
            let (tx, mut rx) = event_channel();
            let handle = controller.start_download(&url, tx)?;

            while let Some(event) = rx.recv().await {
                match event {
                    DownloadEvent::Started { path } => info!("Downloading to {}", path.display()),
                    DownloadEvent::Progress { percent, .. } => info!("{}%", percent),
                    DownloadEvent::Finished { path, success, .. } => {
                        info!("Finished {} (success={})", path.display(), success)
                    }
                    DownloadEvent::Error { cause } => error!("Download failed: {}", cause),
                    DownloadEvent::Complete { url } => info!("Complete: {}", url),
                }
            }

            let result = handle.wait().await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Command::Record { long, stop_after } => {
            let recorder = controller.recorder()?;
            if long {
                recorder.set_max_duration(MaxDuration::Long);
            }
            controller.start_recording()?;

            if let Some(secs) = stop_after {
                let recorder = recorder.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(std::time::Duration::from_secs(secs)).await;
                    recorder.stop();
                });
            }

            while let Some(event) = record_rx.recv().await {
                match event {
                    RecordEvent::Started => info!("Recording..."),
                    RecordEvent::Progress(p) => {
                        info!("{}s elapsed, {}s left ({}%)", p.elapsed_secs, p.remaining_secs, p.percent)
                    }
                    RecordEvent::Stopped { success } => {
                        if success {
                            info!("Saved {}", recorder.output_path().display());
                        } else {
                            warn!("Recording was too short to keep");
                        }
                        break;
                    }
                }
            }
        }

        Command::Play { path } => {
            controller.start_playing(&path).await?;
            drain_playback(&mut play_rx).await;
        }

        Command::PlayRecording => {
            controller.start_playing_recorded_file().await?;
            drain_playback(&mut play_rx).await;
        }

        Command::Export => {
            let encoded = controller
                .export_recording()
                .context("Failed to export recording")?;
            println!("{}", encoded);
        }

        Command::Delete => {
            let deleted = controller.delete_recorded_file().await?;
            info!("Recording deleted: {}", deleted);
        }

        Command::Cleanup => {
            let removed = controller.cleanup_downloads()?;
            info!("Removed {} stale downloads", removed);
        }
    }

    Ok(())
}

async fn drain_playback(events: &mut tokio::sync::mpsc::UnboundedReceiver<PlayEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            PlayEvent::Started { path } => info!("Playing {}", path.display()),
            PlayEvent::Progress(p) => {
                info!("{}s played, {}s left ({}%)", p.elapsed_secs, p.remaining_secs, p.percent)
            }
            PlayEvent::Paused { .. } | PlayEvent::Resumed { .. } => {}
            PlayEvent::Stopped { path } => {
                info!("Stopped {}", path.display());
                break;
            }
            PlayEvent::Error { path, cause } => {
                error!("Cannot play {}: {}", path.display(), cause);
                break;
            }
        }
    }
}
