//! Multipart MJPEG reader
//!
//! Cuts a `multipart/x-mixed-replace` byte stream into JPEG frames.
//!
//! ```text
//! --boundary\r\n
//! Content-Type: image/jpeg\r\n
//! Content-Length: 4711\r\n      (optional)
//! \r\n
//! <jpeg bytes>\r\n
//! --boundary\r\n
//! ...
//! ```
//!
//! With a `Content-Length` header the payload is taken by length. Without
//! one the payload runs up to the next boundary marker. Bytes before the
//! first marker are skipped.
//!
//! A part may not grow past the frame size limit, whether by its announced
//! length, its unterminated headers or a payload with no following marker.
//! Exceeding it is a protocol error that ends the reader.

use bytes::{Buf, Bytes, BytesMut};

use super::frame::Frame;
use super::source::ByteSource;
use crate::error::{ConnectionError, ProtocolError, Result};

/// Default upper bound for one part, headers included
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Extract the boundary token from a multipart content type
///
/// Accepts quoted values and tolerates a leading `--` some cameras include
/// in the parameter itself.
pub fn parse_boundary(content_type: &str) -> Result<String> {
    let mut params = content_type.split(';');
    let mime = params.next().unwrap_or_default().trim();
    if !mime.to_ascii_lowercase().starts_with("multipart/") {
        return Err(ConnectionError::NotMultipart(content_type.to_string()).into());
    }

    for param in params {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        if !key.trim().eq_ignore_ascii_case("boundary") {
            continue;
        }

        let value = value.trim().trim_matches('"').trim();
        let value = value.strip_prefix("--").unwrap_or(value);
        if value.is_empty() {
            break;
        }
        return Ok(value.to_string());
    }

    Err(ProtocolError::MissingBoundary.into())
}

/// Incremental frame parser over pushed bytes
#[derive(Debug)]
pub struct FrameParser {
    marker: Vec<u8>,
    buf: BytesMut,
    /// Offset below which no marker can start, for payloads without length
    scanned: usize,
    max_frame_size: usize,
}

impl FrameParser {
    pub fn new(boundary: &str) -> Self {
        let mut marker = Vec::with_capacity(boundary.len() + 2);
        marker.extend_from_slice(b"--");
        marker.extend_from_slice(boundary.as_bytes());

        Self {
            marker,
            buf: BytesMut::with_capacity(64 * 1024),
            scanned: 0,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Set the largest part accepted from upstream
    pub fn with_max_frame_size(mut self, limit: usize) -> Self {
        self.max_frame_size = limit;
        self
    }

    /// Append bytes read from upstream
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Bytes held but not yet emitted
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Next complete frame, if the buffer holds one
    ///
    /// Fails once the part being assembled exceeds the frame size limit.
    /// The buffered bytes are discarded then.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        let result = self.parse();
        if result.is_err() {
            self.buf.clear();
            self.scanned = 0;
        }
        result
    }

    fn parse(&mut self) -> Result<Option<Frame>> {
        loop {
            let start = match find(&self.buf, &self.marker, 0) {
                Some(pos) => pos,
                None => {
                    // Keep a tail that could still be the start of a marker
                    let keep = self.marker.len().saturating_sub(1);
                    if self.buf.len() > keep {
                        self.buf.advance(self.buf.len() - keep);
                    }
                    self.scanned = 0;
                    return Ok(None);
                }
            };
            if start > 0 {
                self.buf.advance(start);
                self.scanned = self.scanned.saturating_sub(start);
            }

            let after_marker = self.marker.len();
            let Some((headers_end, body_start)) = header_end(&self.buf, after_marker) else {
                self.check_size(self.buf.len())?;
                return Ok(None);
            };
            let content_length = content_length(&self.buf[after_marker..headers_end]);

            let body = match content_length {
                Some(len) => {
                    let end = body_start.checked_add(len).unwrap_or(usize::MAX);
                    self.check_size(end)?;
                    if self.buf.len() < end {
                        return Ok(None);
                    }
                    let mut part = self.buf.split_to(end);
                    part.advance(body_start);
                    self.scanned = 0;
                    part.freeze()
                }
                None => {
                    let from = self.scanned.max(body_start);
                    let Some(next) = find(&self.buf, &self.marker, from) else {
                        self.check_size(self.buf.len())?;
                        self.scanned = self.buf.len().saturating_sub(self.marker.len() - 1).max(body_start);
                        return Ok(None);
                    };
                    let mut part = self.buf.split_to(next);
                    part.advance(body_start);
                    self.scanned = 0;
                    trim_line_end(part.freeze())
                }
            };

            if !body.is_empty() {
                return Ok(Some(Frame::new(body)));
            }
        }
    }

    fn check_size(&self, size: usize) -> Result<()> {
        if size > self.max_frame_size {
            return Err(ProtocolError::OversizedFrame {
                size,
                limit: self.max_frame_size,
            }
            .into());
        }
        Ok(())
    }
}

/// Reads frames from a [`ByteSource`]
pub struct MjpegReader<S> {
    source: S,
    boundary: String,
    parser: FrameParser,
    finished: bool,
}

impl<S: ByteSource> MjpegReader<S> {
    pub fn new(source: S, boundary: &str) -> Self {
        Self {
            source,
            boundary: boundary.to_string(),
            parser: FrameParser::new(boundary),
            finished: false,
        }
    }

    /// Set the largest part accepted from upstream
    pub fn with_max_frame_size(mut self, limit: usize) -> Self {
        self.parser = self.parser.with_max_frame_size(limit);
        self
    }

    /// Boundary token announced by upstream
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Read the next frame
    ///
    /// Returns `None` once upstream has closed, or an error once it has
    /// failed or sent an oversized part. Either way the reader is spent
    /// afterwards.
    pub async fn next_frame(&mut self) -> Option<Result<Frame>> {
        loop {
            if self.finished {
                return None;
            }
            match self.parser.next_frame() {
                Ok(Some(frame)) => return Some(Ok(frame)),
                Ok(None) => {}
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }

            match self.source.next_chunk().await {
                Ok(Some(chunk)) => self.parser.push(&chunk),
                Ok(None) => {
                    self.finished = true;
                    if self.parser.buffered() > 0 {
                        tracing::trace!(
                            discarded = self.parser.buffered(),
                            "Upstream closed mid-frame"
                        );
                    }
                    return None;
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl<S> std::fmt::Debug for MjpegReader<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MjpegReader")
            .field("boundary", &self.boundary)
            .field("finished", &self.finished)
            .finish()
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || haystack.len() < from + needle.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

/// Locate the blank line ending a part's headers
///
/// Returns the end of the header block and the start of the payload.
fn header_end(buf: &[u8], from: usize) -> Option<(usize, usize)> {
    let crlf = find(buf, b"\r\n\r\n", from).map(|pos| (pos, pos + 4));
    let lf = find(buf, b"\n\n", from).map(|pos| (pos, pos + 2));

    match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn content_length(headers: &[u8]) -> Option<usize> {
    let headers = std::str::from_utf8(headers).ok()?;
    headers.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

fn trim_line_end(mut body: Bytes) -> Bytes {
    if body.ends_with(b"\r\n") {
        body.truncate(body.len() - 2);
    } else if body.ends_with(b"\n") {
        body.truncate(body.len() - 1);
    }
    body
}
