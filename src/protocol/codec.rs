//! Telemetry codec
//!
//! Pure conversions between device wire fields and logical values:
//!
//! ```text
//! zoom/focus/iris   3 hex digits, offset from 0x555     "655" <-> 256
//! pan/tilt          4 hex digits, 0x8000 = 0 degrees    "8000" <-> 0.0
//! continuous speed  2 decimal digits, 01..99            50 = stand still
//! pan speed         2 hex digits, 01..1E
//! tilt speed        1 decimal digit, 1..3
//! flag              "0" | "1"
//! ```
//!
//! Decoders validate width and character class and never coerce. Encoders
//! validate range, so a bad parameter fails before any command is sent.
//! Every mapping is monotonic in the raw value.

use crate::error::{ProtocolError, Result, ValidationError};

use super::constants::*;

/// Parse a fixed-width uppercase or lowercase hex field
fn parse_hex(field: &str, width: usize, name: &'static str) -> Result<u16> {
    if field.len() != width || !field.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(malformed(name, field));
    }
    u16::from_str_radix(field, 16).map_err(|_| malformed(name, field))
}

fn malformed(name: &'static str, field: &str) -> crate::error::Error {
    ProtocolError::MalformedField {
        field: name,
        value: field.to_string(),
    }
    .into()
}

fn out_of_range(name: &'static str, value: f64, min: f64, max: f64) -> crate::error::Error {
    ValidationError::OutOfRange {
        name,
        value,
        min,
        max,
    }
    .into()
}

/// Encode a logical zoom/focus/iris value as a 3-digit hex field
pub fn encode_absolute(value: u16) -> Result<String> {
    if value > ABSOLUTE_MAX {
        return Err(out_of_range(
            "absolute value",
            value as f64,
            0.0,
            ABSOLUTE_MAX as f64,
        ));
    }
    Ok(format!("{:03X}", value + ABSOLUTE_BASELINE))
}

/// Decode a 3-digit hex zoom/focus/iris field into its logical value
///
/// Raw values below the baseline are not something the device reports and
/// are treated as corruption.
pub fn decode_absolute(field: &str) -> Result<u16> {
    let raw = parse_hex(field, ABSOLUTE_WIDTH, "absolute")?;
    raw.checked_sub(ABSOLUTE_BASELINE)
        .ok_or_else(|| malformed("absolute", field))
}

fn raw_to_degrees(raw: u16) -> f64 {
    (raw as f64 - ANGLE_CENTER as f64) / STEPS_PER_DEGREE
}

fn encode_angle(name: &'static str, degrees: f64, raw_min: u16, raw_max: u16) -> Result<String> {
    let min = raw_to_degrees(raw_min);
    let max = raw_to_degrees(raw_max);
    if !degrees.is_finite() {
        return Err(out_of_range(name, degrees, min, max));
    }

    let raw = (ANGLE_CENTER as f64 + degrees * STEPS_PER_DEGREE).round();
    if raw < raw_min as f64 || raw > raw_max as f64 {
        return Err(out_of_range(name, degrees, min, max));
    }
    Ok(format!("{:04X}", raw as u16))
}

/// Encode a pan angle in degrees as a 4-digit hex field
pub fn encode_pan(degrees: f64) -> Result<String> {
    encode_angle("pan", degrees, PAN_RAW_MIN, PAN_RAW_MAX)
}

/// Encode a tilt angle in degrees as a 4-digit hex field
pub fn encode_tilt(degrees: f64) -> Result<String> {
    encode_angle("tilt", degrees, TILT_RAW_MIN, TILT_RAW_MAX)
}

/// Decode a 4-digit hex pan field into degrees
pub fn decode_pan(field: &str) -> Result<f64> {
    parse_hex(field, ANGLE_WIDTH, "pan").map(raw_to_degrees)
}

/// Decode a 4-digit hex tilt field into degrees
pub fn decode_tilt(field: &str) -> Result<f64> {
    parse_hex(field, ANGLE_WIDTH, "tilt").map(raw_to_degrees)
}

/// Encode a continuous movement speed (1..=99, 50 = stand still)
pub fn encode_speed(speed: u8) -> Result<String> {
    if !(CONTINUOUS_SPEED_MIN..=CONTINUOUS_SPEED_MAX).contains(&speed) {
        return Err(out_of_range(
            "speed",
            speed as f64,
            CONTINUOUS_SPEED_MIN as f64,
            CONTINUOUS_SPEED_MAX as f64,
        ));
    }
    Ok(format!("{:02}", speed))
}

/// Encode the pan speed of an absolute move (1..=30)
pub fn encode_pan_speed(speed: u8) -> Result<String> {
    if !(PAN_SPEED_MIN..=PAN_SPEED_MAX).contains(&speed) {
        return Err(out_of_range(
            "pan speed",
            speed as f64,
            PAN_SPEED_MIN as f64,
            PAN_SPEED_MAX as f64,
        ));
    }
    Ok(format!("{:02X}", speed))
}

/// Encode the tilt speed selector of an absolute move (1 slow, 2 mid, 3 fast)
pub fn encode_tilt_speed(selector: u8) -> Result<String> {
    if !(1..=3).contains(&selector) {
        return Err(out_of_range("tilt speed", selector as f64, 1.0, 3.0));
    }
    Ok(selector.to_string())
}

/// Encode an on/off flag
pub fn encode_flag(on: bool) -> &'static str {
    if on {
        "1"
    } else {
        "0"
    }
}

/// Decode an on/off flag
pub fn decode_flag(field: &str) -> Result<bool> {
    match field {
        "1" => Ok(true),
        "0" => Ok(false),
        _ => Err(malformed("flag", field)),
    }
}
