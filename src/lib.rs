//! PTZ camera control and MJPEG stream distribution
//!
//! Two halves share one error type:
//!
//! - [`camera`] drives pan/tilt/zoom/focus/iris cameras over the Panasonic
//!   `aw_ptz` HTTP protocol, one command at a time per camera.
//! - [`video`], [`registry`] and [`server`] read each camera's MJPEG stream
//!   once and fan it out to any number of HTTP viewers, optionally resized.
//!
//! ```text
//!   caller ──► IpCamera ──► aw_ptz CGI                      (control)
//!
//!   camera ──► MjpegReader ──► Distributer ──► Subscription ──► viewer
//!                                  ▲                          (video)
//!                  DistributerRegistry (one per camera)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use ptz_stream::camera::{CameraConfig, IpCamera, ZoomingCamera};
//!
//! # async fn demo() -> ptz_stream::Result<()> {
//! let camera = IpCamera::connect(CameraConfig::with_address("192.168.0.10"))?;
//! let zoom = camera.zoom().await?;
//! camera.zoom_to(zoom + 100).await?;
//! # Ok(())
//! # }
//! ```

pub mod camera;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod stats;
pub mod video;

pub use error::{Error, Result};
pub use registry::{DistributerRegistry, RegistryConfig, StreamSource};
pub use server::{ServerConfig, StreamServer};
pub use video::{CameraId, Distributer, Subscription};
