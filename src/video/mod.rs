//! MJPEG stream reading and fan-out
//!
//! ```text
//!   StreamConnector ──► MjpegReader ──► Distributer ──► Subscription ...
//!     (HTTP GET)        (frames)        (resize, push)   (bounded queue)
//! ```

pub mod distributer;
pub mod frame;
pub mod reader;
pub mod resize;
pub mod source;
pub mod subscription;

pub use distributer::Distributer;
pub use frame::{encode_part, CameraId, Frame, Resolution, MAX_DIMENSION};
pub use reader::{parse_boundary, FrameParser, MjpegReader, DEFAULT_MAX_FRAME_SIZE};
pub use source::{ByteSource, HttpConnector, StreamConnector};
pub use subscription::Subscription;
