use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Source of remote response bodies.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a GET for `url` and return its body once headers arrive.
    async fn open(&self, url: &str) -> MediaResult<Box<dyn BodyReader>>;
}

/// Incremental reader over one response body.
#[async_trait]
pub trait BodyReader: Send {
    /// Declared body length, if the server sent one
    fn content_length(&self) -> Option<u64>;

    /// Read at most `max` bytes. `Ok(None)` marks the end of the body.
    async fn read_chunk(&mut self, max: usize) -> MediaResult<Option<Vec<u8>>>;
}

/// Plain HTTP(S) transport: no auth headers, no range requests.
#[derive(Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&self, url: &str) -> MediaResult<Box<dyn BodyReader>> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(MediaError::HttpStatus(response.status().as_u16()));
        }

        debug!(
            "GET {} -> {} ({:?} bytes)",
            url,
            response.status(),
            response.content_length()
        );

        Ok(Box::new(HttpBody {
            content_length: response.content_length(),
            response,
            pending: Vec::new(),
            offset: 0,
        }))
    }
}

/// Splits the network's arbitrarily sized frames into reads of at most
/// the requested size.
struct HttpBody {
    response: reqwest::Response,
    content_length: Option<u64>,
    pending: Vec<u8>,
    offset: usize,
}

#[async_trait]
impl BodyReader for HttpBody {
    fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    async fn read_chunk(&mut self, max: usize) -> MediaResult<Option<Vec<u8>>> {
        while self.offset >= self.pending.len() {
            match self.response.chunk().await? {
                Some(frame) => {
                    self.pending = frame.to_vec();
                    self.offset = 0;
                }
                None => return Ok(None),
            }
        }

        let end = (self.offset + max).min(self.pending.len());
        let chunk = self.pending[self.offset..end].to_vec();
        self.offset = end;
        Ok(Some(chunk))
    }
}
