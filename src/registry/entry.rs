//! Registered camera stream sources

/// Encoding of a camera's video output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamType {
    /// `multipart/x-mixed-replace` JPEG stream
    Mjpeg,
    /// H.264 over RTSP; not distributed
    H264,
}

impl std::fmt::Display for StreamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamType::Mjpeg => write!(f, "mjpeg"),
            StreamType::H264 => write!(f, "h264"),
        }
    }
}

/// Where a camera's video comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSource {
    pub url: String,
    pub kind: StreamType,
}

impl StreamSource {
    /// An MJPEG source at `url`
    pub fn mjpeg(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: StreamType::Mjpeg,
        }
    }

    /// Whether the registry can distribute this source
    pub fn is_distributable(&self) -> bool {
        self.kind == StreamType::Mjpeg
    }
}
