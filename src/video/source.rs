//! Upstream byte sources and connectors

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;

use super::reader::{parse_boundary, MjpegReader, DEFAULT_MAX_FRAME_SIZE};
use crate::error::{ConnectionError, Result};

/// A stream of byte chunks from upstream
pub trait ByteSource: Send {
    /// Next chunk, or `None` once upstream has closed
    fn next_chunk(&mut self) -> impl Future<Output = Result<Option<Bytes>>> + Send;
}

impl ByteSource for reqwest::Response {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        Ok(self.chunk().await?)
    }
}

/// Opens upstream MJPEG streams
///
/// The distributer reconnects through the same connector, so implementations
/// must be shareable across tasks.
pub trait StreamConnector: Send + Sync + 'static {
    type Source: ByteSource + 'static;

    fn connect(&self, url: &str) -> impl Future<Output = Result<MjpegReader<Self::Source>>> + Send;
}

/// Connector for HTTP `multipart/x-mixed-replace` streams
#[derive(Debug, Clone)]
pub struct HttpConnector {
    client: reqwest::Client,
    max_frame_size: usize,
}

impl HttpConnector {
    /// Create a connector
    ///
    /// Only connection setup is bounded by `connect_timeout`: the response
    /// body is an endless stream.
    pub fn new(connect_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self {
            client,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        })
    }

    /// Set the largest part accepted from each upstream
    pub fn max_frame_size(mut self, limit: usize) -> Self {
        self.max_frame_size = limit;
        self
    }
}

impl StreamConnector for HttpConnector {
    type Source = reqwest::Response;

    async fn connect(&self, url: &str) -> Result<MjpegReader<reqwest::Response>> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConnectionError::Status(status.as_u16()).into());
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let boundary = parse_boundary(&content_type)?;

        tracing::debug!(url = %url, boundary = %boundary, "Connected to upstream stream");

        Ok(MjpegReader::new(response, &boundary).with_max_frame_size(self.max_frame_size))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory upstreams for tests

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use bytes::Bytes;
    use tokio::sync::mpsc;

    use super::{ByteSource, StreamConnector};
    use crate::error::{ConnectionError, Result};
    use crate::video::frame::encode_part;
    use crate::video::reader::MjpegReader;

    pub(crate) struct ChannelSource {
        rx: mpsc::UnboundedReceiver<Bytes>,
    }

    impl ChannelSource {
        pub(crate) fn new(rx: mpsc::UnboundedReceiver<Bytes>) -> Self {
            Self { rx }
        }
    }

    impl ByteSource for ChannelSource {
        async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
            Ok(self.rx.recv().await)
        }
    }

    /// Hands out prepared feeds in order; fails once they run out
    pub(crate) struct MockConnector {
        boundary: String,
        feeds: Mutex<VecDeque<mpsc::UnboundedReceiver<Bytes>>>,
        connects: AtomicUsize,
    }

    impl MockConnector {
        pub(crate) fn new(boundary: &str) -> Self {
            Self {
                boundary: boundary.to_string(),
                feeds: Mutex::new(VecDeque::new()),
                connects: AtomicUsize::new(0),
            }
        }

        /// Queue a feed for the next connect
        pub(crate) fn add_feed(&self) -> mpsc::UnboundedSender<Bytes> {
            let (tx, rx) = mpsc::unbounded_channel();
            self.feeds.lock().unwrap().push_back(rx);
            tx
        }

        pub(crate) fn connects(&self) -> usize {
            self.connects.load(Ordering::SeqCst)
        }
    }

    impl StreamConnector for MockConnector {
        type Source = ChannelSource;

        async fn connect(&self, url: &str) -> Result<MjpegReader<ChannelSource>> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            let feed = self.feeds.lock().unwrap().pop_front();
            match feed {
                Some(rx) => Ok(MjpegReader::new(ChannelSource::new(rx), &self.boundary)),
                None => Err(ConnectionError::Unreachable(url.to_string()).into()),
            }
        }
    }

    /// Upstream part carrying `payload`
    pub(crate) fn part(boundary: &str, payload: &[u8]) -> Bytes {
        encode_part(boundary, payload)
    }

    /// Payload of a downstream part
    pub(crate) fn payload_of(part: &[u8]) -> &[u8] {
        let start = part
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .map(|pos| pos + 4)
            .unwrap();
        &part[start..part.len() - 2]
    }
}
