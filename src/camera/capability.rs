//! Camera capability traits
//!
//! Camera families share a capability surface rather than a hierarchy:
//! callers bound on the traits they actually use (`T: ZoomingCamera`), and a
//! driver implements whichever ones its hardware supports.
//!
//! All operations are mutually exclusive per camera. Depending on the
//! camera's [`BusyPolicy`](super::session::BusyPolicy), a call made while
//! another one is in flight fails with [`Error::Busy`](crate::error::Error::Busy)
//! or waits a bounded time for the slot.

use std::future::Future;

use crate::error::Result;

use super::types::{ContinuousSpeed, FocusValue, IrisValue, PanSpeed, Position, TiltSpeed};

/// Pan/tilt movement
pub trait MovingCamera: Send + Sync {
    /// Move to an absolute position
    fn move_to(
        &self,
        position: Position,
        pan_speed: PanSpeed,
        tilt_speed: TiltSpeed,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Start a continuous movement; `STOP` on both axes stops it
    fn move_continuous(
        &self,
        pan: ContinuousSpeed,
        tilt: ContinuousSpeed,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Current absolute position
    fn position(&self) -> impl Future<Output = Result<Position>> + Send;
}

/// Zoom control
pub trait ZoomingCamera: Send + Sync {
    /// Zoom to an absolute value
    fn zoom_to(&self, zoom: u16) -> impl Future<Output = Result<()>> + Send;

    /// Start a continuous zoom; `STOP` stops it
    fn zoom_continuous(&self, speed: ContinuousSpeed) -> impl Future<Output = Result<()>> + Send;

    /// Current zoom value
    fn zoom(&self) -> impl Future<Output = Result<u16>> + Send;
}

/// Focus control
pub trait FocusingCamera: Send + Sync {
    /// Apply a focus value; the absolute focus is only sent with autofocus off
    fn set_focus(&self, value: FocusValue) -> impl Future<Output = Result<()>> + Send;

    /// Switch autofocus on or off
    fn set_autofocus(&self, on: bool) -> impl Future<Output = Result<()>> + Send;

    /// Start a continuous focus movement
    fn move_focus(&self, speed: ContinuousSpeed) -> impl Future<Output = Result<()>> + Send;

    /// Current focus value and autofocus state
    fn focus(&self) -> impl Future<Output = Result<FocusValue>> + Send;
}

/// Iris control
pub trait IrisCamera: Send + Sync {
    /// Apply an iris value; the absolute iris is only sent with auto iris off
    fn set_iris(&self, value: IrisValue) -> impl Future<Output = Result<()>> + Send;

    /// Switch auto iris on or off
    fn set_autoiris(&self, on: bool) -> impl Future<Output = Result<()>> + Send;

    /// Start a continuous iris movement
    fn move_iris(&self, speed: ContinuousSpeed) -> impl Future<Output = Result<()>> + Send;

    /// Current iris value and auto iris state
    fn iris(&self) -> impl Future<Output = Result<IrisValue>> + Send;
}
