//! Frame and stream identity types

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, ValidationError};

/// Largest accepted resize dimension
pub const MAX_DIMENSION: u32 = 8192;

/// Identifier of a camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CameraId(pub u32);

impl std::fmt::Display for CameraId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for CameraId {
    fn from(id: u32) -> Self {
        CameraId(id)
    }
}

/// One JPEG image cut from a multipart stream
///
/// Cheap to clone: the payload is reference counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    data: Bytes,
}

impl Frame {
    pub fn new(data: Bytes) -> Self {
        Self { data }
    }

    /// JPEG payload
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_data(self) -> Bytes {
        self.data
    }
}

/// Target size requested by a viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Validate a width/height pair
    pub fn new(width: u32, height: u32) -> Result<Self> {
        for value in [width, height] {
            if value == 0 || value > MAX_DIMENSION {
                return Err(ValidationError::InvalidDimension(value.to_string()).into());
            }
        }
        Ok(Self { width, height })
    }

    /// Parse optional query parameters
    ///
    /// Neither given means no resize. One without the other, a non-numeric,
    /// non-positive or oversized value is rejected, never clamped.
    pub fn parse(width: Option<&str>, height: Option<&str>) -> Result<Option<Self>> {
        match (width, height) {
            (None, None) => Ok(None),
            (Some(w), Some(h)) => Ok(Some(Self::new(parse_dimension(w)?, parse_dimension(h)?)?)),
            _ => Err(ValidationError::IncompleteDimensions.into()),
        }
    }
}

fn parse_dimension(raw: &str) -> Result<u32> {
    match raw.trim().parse::<i64>() {
        Ok(value) if value > 0 && value <= MAX_DIMENSION as i64 => Ok(value as u32),
        _ => Err(ValidationError::InvalidDimension(raw.to_string()).into()),
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Wrap a JPEG payload as one multipart part
///
/// ```text
/// --<boundary>\r\n
/// Content-Type: image/jpeg\r\n
/// Content-Length: <n>\r\n
/// \r\n
/// <payload>\r\n
/// ```
pub fn encode_part(boundary: &str, jpeg: &[u8]) -> Bytes {
    let header = format!(
        "--{}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        boundary,
        jpeg.len()
    );

    let mut part = BytesMut::with_capacity(header.len() + jpeg.len() + 2);
    part.put_slice(header.as_bytes());
    part.put_slice(jpeg);
    part.put_slice(b"\r\n");
    part.freeze()
}
