//! Streamed HTTP downloads into local storage with percent-based progress.

mod downloader;
mod transport;

pub use downloader::{DownloadHandle, Downloader, DOWNLOAD_CHUNK_SIZE};
pub use transport::{BodyReader, HttpTransport, Transport};
