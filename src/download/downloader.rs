use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::transport::Transport;
use crate::events::{
    DownloadEvent, DownloadResult, EventSink, MediaOperation, OperationStatus,
};
use crate::error::{MediaError, MediaResult};
use crate::storage::StorageLayout;
use crate::utils::lock;

/// Bytes requested per body read
pub const DOWNLOAD_CHUNK_SIZE: usize = 2048;

struct ActiveDownload {
    operation: MediaOperation,
    path: PathBuf,
    cancelled: Arc<AtomicBool>,
    /// Closed once the job has released its file
    done: watch::Receiver<()>,
}

type ActiveSlot = Arc<Mutex<Option<ActiveDownload>>>;

/// Streams remote audio files to local storage, one download at a time.
///
/// Starting a download while another one is running cancels the earlier one;
/// it still delivers its own terminal `Finished { success: false }`.
pub struct Downloader {
    transport: Arc<dyn Transport>,
    storage: StorageLayout,
    chunk_size: usize,
    active: ActiveSlot,
}

impl Downloader {
    pub fn new(transport: Arc<dyn Transport>, storage: StorageLayout) -> Self {
        Self {
            transport,
            storage,
            chunk_size: DOWNLOAD_CHUNK_SIZE,
            active: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn storage(&self) -> &StorageLayout {
        &self.storage
    }

    /// The download currently in flight, if any
    pub fn current(&self) -> Option<MediaOperation> {
        lock(&self.active).as_ref().map(|a| a.operation.clone())
    }

    /// Start fetching `url` into the audio directory.
    ///
    /// `Started` is delivered before this returns. If the destination is
    /// already a complete file the download finishes immediately without
    /// touching the network. A destination still being written by an
    /// in-flight download is fetched again once that download is cancelled.
    pub fn start_download(&self, url: &str, events: EventSink<DownloadEvent>) -> DownloadHandle {
        let path = self.storage.download_path(url);
        let _ = events.send(DownloadEvent::Started { path: path.clone() });

        let operation = MediaOperation::new(url);
        let id = operation.id;
        let cancelled = Arc::new(AtomicBool::new(false));
        let (done, _) = watch::channel(());

        let superseded = {
            let mut active = lock(&self.active);
            let writing_same_file = active.as_ref().is_some_and(|a| a.path == path);

            if !writing_same_file && path.is_file() {
                drop(active);
                info!("{} already downloaded, skipping fetch", path.display());
                let _ = events.send(DownloadEvent::Finished {
                    path: path.clone(),
                    success: true,
                    percent: 100,
                });
                return DownloadHandle::completed(DownloadResult {
                    file_path: path,
                    succeeded: true,
                    final_percent: 100,
                });
            }

            let previous = active.replace(ActiveDownload {
                operation,
                path: path.clone(),
                cancelled: Arc::clone(&cancelled),
                done: done.subscribe(),
            });

            previous.and_then(|previous| {
                warn!(
                    "Replacing in-flight download {} ({})",
                    previous.operation.id, previous.operation.resource
                );
                previous.cancelled.store(true, Ordering::SeqCst);
                writing_same_file.then_some(previous.done)
            })
        };

        info!("Starting download {}: {} -> {}", id, url, path.display());

        let job = DownloadJob {
            id,
            url: url.to_string(),
            path: path.clone(),
            chunk_size: self.chunk_size,
            transport: Arc::clone(&self.transport),
            cancelled: Arc::clone(&cancelled),
            active: Arc::clone(&self.active),
            events,
            superseded,
            _done: done,
        };

        DownloadHandle {
            path,
            cancelled,
            task: Some(tokio::spawn(job.run())),
            result: None,
        }
    }
}

/// Handle to one download attempt.
pub struct DownloadHandle {
    path: PathBuf,
    cancelled: Arc<AtomicBool>,
    task: Option<JoinHandle<DownloadResult>>,
    result: Option<DownloadResult>,
}

impl DownloadHandle {
    fn completed(result: DownloadResult) -> Self {
        Self {
            path: result.file_path.clone(),
            cancelled: Arc::new(AtomicBool::new(false)),
            task: None,
            result: Some(result),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Request cancellation. A read already in flight completes; the
    /// download then ends with a failed terminal event.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Wait for the terminal outcome.
    pub async fn wait(mut self) -> DownloadResult {
        if let Some(result) = self.result.take() {
            return result;
        }

        match self.task.take() {
            Some(task) => match task.await {
                Ok(result) => result,
                Err(e) => {
                    error!("Download task for {} panicked: {}", self.path.display(), e);
                    DownloadResult {
                        file_path: self.path,
                        succeeded: false,
                        final_percent: -1,
                    }
                }
            },
            None => DownloadResult {
                file_path: self.path,
                succeeded: false,
                final_percent: -1,
            },
        }
    }
}

struct DownloadJob {
    id: Uuid,
    url: String,
    path: PathBuf,
    chunk_size: usize,
    transport: Arc<dyn Transport>,
    cancelled: Arc<AtomicBool>,
    active: ActiveSlot,
    events: EventSink<DownloadEvent>,
    /// Cancelled job writing to the same file, awaited before truncating it
    superseded: Option<watch::Receiver<()>>,
    _done: watch::Sender<()>,
}

impl DownloadJob {
    async fn run(mut self) -> DownloadResult {
        if let Some(mut previous) = self.superseded.take() {
            debug!("Download {} waiting for the replaced writer of {}", self.id, self.path.display());
            while previous.changed().await.is_ok() {}
        }

        let outcome = self.fetch().await;

        // Leave the slot before the terminal event so a consumer reacting to
        // it can start the next download.
        {
            let mut active = lock(&self.active);
            if active.as_ref().map(|a| a.operation.id) == Some(self.id) {
                *active = None;
            }
        }

        match outcome {
            Ok(bytes) => {
                info!("Download {} finished: {} bytes", self.id, bytes);
                let _ = self.events.send(DownloadEvent::Finished {
                    path: self.path.clone(),
                    success: true,
                    percent: 100,
                });
                let _ = self.events.send(DownloadEvent::Complete {
                    url: self.url.clone(),
                });
                DownloadResult {
                    file_path: self.path,
                    succeeded: true,
                    final_percent: 100,
                }
            }
            Err(e) => {
                // The partial file is left for the caller to clean up
                error!("Download {} failed: {}", self.id, e);
                let _ = self.events.send(DownloadEvent::Finished {
                    path: self.path.clone(),
                    success: false,
                    percent: -1,
                });
                let _ = self.events.send(DownloadEvent::Error { cause: Arc::new(e) });
                DownloadResult {
                    file_path: self.path,
                    succeeded: false,
                    final_percent: -1,
                }
            }
        }
    }

    fn check_cancelled(&self) -> MediaResult<()> {
        if self.cancelled.load(Ordering::SeqCst) {
            return Err(MediaError::Cancelled);
        }
        Ok(())
    }

    fn mark_active(&self) {
        if let Some(active) = lock(&self.active).as_mut() {
            if active.operation.id == self.id {
                active.operation.status = OperationStatus::Active;
            }
        }
    }

    async fn fetch(&self) -> MediaResult<u64> {
        let mut body = self.transport.open(&self.url).await?;
        self.check_cancelled()?;
        self.mark_active();

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut sink = BufWriter::new(File::create(&self.path).await?);

        let content_length = body.content_length().filter(|len| *len > 0);
        if content_length.is_none() {
            warn!("{} sent no content length, progress disabled", self.url);
        }

        let mut total_read = 0u64;
        let mut last_percent = 0i32;

        while let Some(chunk) = body.read_chunk(self.chunk_size).await? {
            self.check_cancelled()?;

            sink.write_all(&chunk).await?;
            total_read += chunk.len() as u64;

            if let Some(len) = content_length {
                let percent = (total_read * 100 / len).min(100) as i32;
                if percent > last_percent {
                    last_percent = percent;
                    debug!("Download {}: {}%", self.id, percent);
                    let _ = self.events.send(DownloadEvent::Progress {
                        path: self.path.clone(),
                        percent,
                    });
                }
            }
        }

        sink.flush().await?;
        sink.into_inner().sync_all().await?;

        Ok(total_read)
    }
}
