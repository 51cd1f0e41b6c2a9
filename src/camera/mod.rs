//! PTZ camera control
//!
//! ```text
//!   caller ──► IpCamera ──► CameraSession (one command at a time)
//!                 │
//!                 ├──► Command (codec-validated)
//!                 └──► CommandTransport ──► device ──► reply tag check ──► decode
//! ```
//!
//! Callers depend on the capability traits ([`MovingCamera`],
//! [`ZoomingCamera`], [`FocusingCamera`], [`IrisCamera`]) rather than on a
//! concrete driver.

pub mod capability;
pub mod config;
pub mod ipcamera;
pub mod session;
pub mod transport;
pub mod types;

pub use capability::{FocusingCamera, IrisCamera, MovingCamera, ZoomingCamera};
pub use config::{CameraConfig, ConfigSource};
pub use ipcamera::IpCamera;
pub use session::{BusyPolicy, CameraSession, SlotGuard};
pub use transport::{CommandTransport, HttpTransport};
pub use types::{ContinuousSpeed, FocusValue, IrisValue, PanSpeed, Position, TiltSpeed, ZoomPosition};
