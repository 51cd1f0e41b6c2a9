//! Error types
//!
//! Every fallible operation in the crate returns [`Result`]. The variants of
//! [`Error`] follow the taxonomy callers act on:
//!
//! - `Connection` / `Protocol`: the device or upstream could not be reached,
//!   timed out, or answered with something we could not trust. Never retried
//!   internally.
//! - `Busy`: a command was issued while another one held the camera.
//! - `ViewerLimit`: the server already serves its maximum number of viewers.
//! - `Validation`: rejected before any network interaction.
//! - `StreamUnavailable`: the camera has no MJPEG source to distribute.

use std::time::Duration;

use crate::video::frame::CameraId;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// Network-level failure talking to a device or upstream stream
    Connection(ConnectionError),
    /// Device or upstream answered with corrupted or unexpected data
    Protocol(ProtocolError),
    /// The camera's command slot is held by another caller
    Busy(String),
    /// The server is at its concurrent viewer limit
    ViewerLimit(CameraId),
    /// Parameters rejected before touching the network
    Validation(ValidationError),
    /// No compatible live source for this camera
    StreamUnavailable(CameraId),
    /// Local I/O failure (bind, accept)
    Io(std::io::Error),
}

impl Error {
    /// Whether this error belongs to the connection class
    ///
    /// Protocol errors count: a garbled reply means the link can't be trusted.
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection(_) | Error::Protocol(_))
    }

    /// Whether this error is a busy rejection
    pub fn is_busy(&self) -> bool {
        matches!(self, Error::Busy(_))
    }

    /// Whether this error is a validation failure
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Connection(e) => write!(f, "Connection error: {}", e),
            Error::Protocol(e) => write!(f, "Protocol error: {}", e),
            Error::Busy(camera) => write!(f, "Camera busy: {}", camera),
            Error::ViewerLimit(id) => write!(f, "Viewer limit reached, camera {} not served", id),
            Error::Validation(e) => write!(f, "Validation error: {}", e),
            Error::StreamUnavailable(id) => write!(f, "No stream available for camera {}", id),
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connection(e) => Some(e),
            Error::Protocol(e) => Some(e),
            Error::Validation(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConnectionError> for Error {
    fn from(e: ConnectionError) -> Self {
        Error::Connection(e)
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Error::Protocol(e)
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Error::Validation(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Connection(ConnectionError::Timeout(None))
        } else if let Some(status) = e.status() {
            Error::Connection(ConnectionError::Status(status.as_u16()))
        } else {
            Error::Connection(ConnectionError::Unreachable(e.to_string()))
        }
    }
}

/// Network-level failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Could not reach the peer
    Unreachable(String),
    /// No reply within the configured timeout
    Timeout(Option<Duration>),
    /// Peer answered with a non-success HTTP status
    Status(u16),
    /// Upstream closed the byte stream
    UpstreamClosed,
    /// Upstream is not serving a multipart stream
    NotMultipart(String),
}

impl std::fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionError::Unreachable(msg) => write!(f, "unreachable: {}", msg),
            ConnectionError::Timeout(Some(d)) => write!(f, "no reply within {:?}", d),
            ConnectionError::Timeout(None) => write!(f, "timed out"),
            ConnectionError::Status(code) => write!(f, "unexpected HTTP status {}", code),
            ConnectionError::UpstreamClosed => write!(f, "upstream closed"),
            ConnectionError::NotMultipart(ct) => {
                write!(f, "expected multipart stream, got content type {:?}", ct)
            }
        }
    }
}

impl std::error::Error for ConnectionError {}

/// Corrupted or unexpected data from a device or upstream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Response did not start with the tag expected for the command sent
    UnexpectedResponse {
        expected: &'static str,
        actual: String,
    },
    /// A telemetry field had the wrong width or character class
    MalformedField { field: &'static str, value: String },
    /// Content type carried no boundary parameter
    MissingBoundary,
    /// A frame could not be decoded or re-encoded as JPEG
    UndecodableFrame(String),
    /// An upstream part grew past the frame size limit
    OversizedFrame { size: usize, limit: usize },
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::UnexpectedResponse { expected, actual } => {
                write!(f, "expected response tag {:?}, got {:?}", expected, actual)
            }
            ProtocolError::MalformedField { field, value } => {
                write!(f, "malformed {} field {:?}", field, value)
            }
            ProtocolError::MissingBoundary => write!(f, "multipart boundary missing"),
            ProtocolError::UndecodableFrame(msg) => write!(f, "undecodable frame: {}", msg),
            ProtocolError::OversizedFrame { size, limit } => {
                write!(f, "frame of {} bytes exceeds limit of {} bytes", size, limit)
            }
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Parameters rejected before any network interaction
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Numeric parameter outside its supported range
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    /// Resize dimension that is non-numeric, zero, negative or too large
    InvalidDimension(String),
    /// Only one of width/height supplied
    IncompleteDimensions,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::OutOfRange {
                name,
                value,
                min,
                max,
            } => write!(f, "{} {} outside [{}, {}]", name, value, min, max),
            ValidationError::InvalidDimension(raw) => write!(f, "invalid dimension {:?}", raw),
            ValidationError::IncompleteDimensions => {
                write!(f, "width and height must be given together")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        let conn: Error = ConnectionError::Timeout(Some(Duration::from_secs(2))).into();
        assert!(conn.is_connection());
        assert!(!conn.is_busy());

        let proto: Error = ProtocolError::MissingBoundary.into();
        assert!(proto.is_connection());

        let busy = Error::Busy("cam1".into());
        assert!(busy.is_busy());
        assert!(!busy.is_connection());

        let invalid: Error = ValidationError::IncompleteDimensions.into();
        assert!(invalid.is_validation());

        let full = Error::ViewerLimit(CameraId(2));
        assert!(!full.is_busy());
        assert!(!full.is_connection());
    }

    #[test]
    fn test_display() {
        let err: Error = ProtocolError::UnexpectedResponse {
            expected: "gz",
            actual: "gs655".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Protocol error: expected response tag \"gz\", got \"gs655\""
        );

        let err = Error::StreamUnavailable(CameraId(4));
        assert_eq!(err.to_string(), "No stream available for camera 4");
    }
}
