//! Camera value types
//!
//! Immutable values exchanged with the protocol client. Speed newtypes are
//! validated on construction so an out-of-range speed never reaches the
//! command builder.

use crate::error::{Result, ValidationError};
use crate::protocol::constants::{
    CONTINUOUS_SPEED_MAX, CONTINUOUS_SPEED_MIN, CONTINUOUS_SPEED_STOP, PAN_SPEED_MAX,
    PAN_SPEED_MIN,
};

/// Pan/tilt position in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    /// Horizontal angle, positive to the right
    pub pan: f64,
    /// Vertical angle, positive upward
    pub tilt: f64,
}

impl Position {
    /// Create a new position
    pub fn new(pan: f64, tilt: f64) -> Self {
        Self { pan, tilt }
    }
}

/// Position plus zoom
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomPosition {
    pub position: Position,
    /// Logical zoom value (0 = widest)
    pub zoom: u16,
}

impl ZoomPosition {
    pub fn new(pan: f64, tilt: f64, zoom: u16) -> Self {
        Self {
            position: Position::new(pan, tilt),
            zoom,
        }
    }

    pub fn pan(&self) -> f64 {
        self.position.pan
    }

    pub fn tilt(&self) -> f64 {
        self.position.tilt
    }
}

/// Focus value and autofocus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusValue {
    pub focus: u16,
    pub autofocus: bool,
}

impl FocusValue {
    pub fn new(focus: u16, autofocus: bool) -> Self {
        Self { focus, autofocus }
    }
}

/// Iris value and auto iris state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrisValue {
    pub iris: u16,
    pub autoiris: bool,
}

impl IrisValue {
    pub fn new(iris: u16, autoiris: bool) -> Self {
        Self { iris, autoiris }
    }
}

/// Pan speed of an absolute move (1..=30)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PanSpeed(u8);

impl PanSpeed {
    /// Slowest pan speed
    pub const MIN: PanSpeed = PanSpeed(PAN_SPEED_MIN);
    /// Fastest pan speed
    pub const MAX: PanSpeed = PanSpeed(PAN_SPEED_MAX);

    pub fn new(speed: u8) -> Result<Self> {
        if (PAN_SPEED_MIN..=PAN_SPEED_MAX).contains(&speed) {
            Ok(Self(speed))
        } else {
            Err(ValidationError::OutOfRange {
                name: "pan speed",
                value: speed as f64,
                min: PAN_SPEED_MIN as f64,
                max: PAN_SPEED_MAX as f64,
            }
            .into())
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

/// Tilt speed of an absolute move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiltSpeed {
    Slow,
    Mid,
    Fast,
}

impl TiltSpeed {
    /// Parse the numeric selector (1 slow, 2 mid, 3 fast)
    pub fn from_selector(selector: u8) -> Result<Self> {
        match selector {
            1 => Ok(TiltSpeed::Slow),
            2 => Ok(TiltSpeed::Mid),
            3 => Ok(TiltSpeed::Fast),
            other => Err(ValidationError::OutOfRange {
                name: "tilt speed",
                value: other as f64,
                min: 1.0,
                max: 3.0,
            }
            .into()),
        }
    }

    /// Numeric selector sent on the wire
    pub fn selector(self) -> u8 {
        match self {
            TiltSpeed::Slow => 1,
            TiltSpeed::Mid => 2,
            TiltSpeed::Fast => 3,
        }
    }
}

/// Continuous movement speed (1..=99)
///
/// 50 stands still, lower values move in the negative direction (left,
/// down, wide, near, close) and higher values in the positive one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ContinuousSpeed(u8);

impl ContinuousSpeed {
    /// Stand still
    pub const STOP: ContinuousSpeed = ContinuousSpeed(CONTINUOUS_SPEED_STOP);

    pub fn new(speed: u8) -> Result<Self> {
        if (CONTINUOUS_SPEED_MIN..=CONTINUOUS_SPEED_MAX).contains(&speed) {
            Ok(Self(speed))
        } else {
            Err(ValidationError::OutOfRange {
                name: "continuous speed",
                value: speed as f64,
                min: CONTINUOUS_SPEED_MIN as f64,
                max: CONTINUOUS_SPEED_MAX as f64,
            }
            .into())
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Signed offset from stand-still, in -49..=49
    pub fn velocity(self) -> i8 {
        self.0 as i8 - CONTINUOUS_SPEED_STOP as i8
    }

    pub fn is_stop(self) -> bool {
        self.0 == CONTINUOUS_SPEED_STOP
    }
}

impl Default for ContinuousSpeed {
    fn default() -> Self {
        Self::STOP
    }
}
