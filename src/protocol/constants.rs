//! Wire constants for the `aw_ptz` camera protocol

/// CGI path commands are sent to
pub const COMMAND_PATH: &str = "/cgi-bin/aw_ptz";

/// URL-encoded `#` every command starts with
pub const COMMAND_PREFIX: &str = "%23";

/// Baseline the 3-digit absolute fields (zoom, focus, iris) are offset from
pub const ABSOLUTE_BASELINE: u16 = 0x555;

/// Largest raw value of a 3-digit absolute field
pub const ABSOLUTE_RAW_MAX: u16 = 0xFFF;

/// Largest logical zoom/focus/iris value
pub const ABSOLUTE_MAX: u16 = ABSOLUTE_RAW_MAX - ABSOLUTE_BASELINE;

/// Width of an absolute zoom/focus/iris field
pub const ABSOLUTE_WIDTH: usize = 3;

/// Raw pan/tilt value at 0 degrees
pub const ANGLE_CENTER: u16 = 0x8000;

/// Raw pan/tilt steps per degree
pub const STEPS_PER_DEGREE: f64 = 121.36;

/// Width of a pan or tilt field
pub const ANGLE_WIDTH: usize = 4;

/// Pan limits (raw), roughly -175 to +175 degrees
pub const PAN_RAW_MIN: u16 = 0x2D09;
pub const PAN_RAW_MAX: u16 = 0xD2F7;

/// Tilt limits (raw), roughly -90 to +30 degrees
pub const TILT_RAW_MIN: u16 = 0x5555;
pub const TILT_RAW_MAX: u16 = 0x8E38;

/// Continuous speed range; 50 stands still
pub const CONTINUOUS_SPEED_MIN: u8 = 1;
pub const CONTINUOUS_SPEED_MAX: u8 = 99;
pub const CONTINUOUS_SPEED_STOP: u8 = 50;

/// Absolute move pan speed range
pub const PAN_SPEED_MIN: u8 = 1;
pub const PAN_SPEED_MAX: u8 = 30;
