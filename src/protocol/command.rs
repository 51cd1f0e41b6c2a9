//! Camera command catalogue
//!
//! Each [`Command`] pairs the code sent to the device with the tag its reply
//! must start with. Constructors run every parameter through the codec, so a
//! `Command` that exists is always well-formed on the wire.
//!
//! | Operation            | Code               | Reply tag |
//! |----------------------|--------------------|-----------|
//! | absolute pan/tilt    | `APS` pppp tttt ss t | `aPS`   |
//! | continuous pan/tilt  | `PTS` pp tt        | `pTS`     |
//! | position query       | `APC`              | `aPC`     |
//! | absolute zoom        | `AXZ` zzz          | `axz`     |
//! | continuous zoom      | `Z` ss             | `zS`      |
//! | zoom query           | `GZ`               | `gz`      |
//! | absolute focus       | `AXF` fff          | `axf`     |
//! | continuous focus     | `F` ss             | `fS`      |
//! | focus query          | `GF`               | `gf`      |
//! | autofocus set/query  | `D1` [f]           | `d1`      |
//! | absolute iris        | `AXI` iii          | `axi`     |
//! | continuous iris      | `I` ss             | `iC`      |
//! | iris query           | `GI`               | `gi`      |
//! | auto iris set        | `D3` f             | `d3`      |

use crate::camera::types::{ContinuousSpeed, PanSpeed, Position, TiltSpeed};
use crate::error::{ProtocolError, Result};

use super::codec;
use super::constants::COMMAND_PREFIX;

/// A single command with the reply tag it expects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    code: String,
    tag: &'static str,
}

impl Command {
    fn new(code: impl Into<String>, tag: &'static str) -> Self {
        Self {
            code: code.into(),
            tag,
        }
    }

    /// Move to an absolute position
    pub fn move_absolute(position: Position, pan_speed: PanSpeed, tilt_speed: TiltSpeed) -> Result<Self> {
        let code = format!(
            "APS{}{}{}{}",
            codec::encode_pan(position.pan)?,
            codec::encode_tilt(position.tilt)?,
            codec::encode_pan_speed(pan_speed.get())?,
            codec::encode_tilt_speed(tilt_speed.selector())?,
        );
        Ok(Self::new(code, "aPS"))
    }

    /// Start (or stop, at 50/50) a continuous pan/tilt movement
    pub fn move_continuous(pan: ContinuousSpeed, tilt: ContinuousSpeed) -> Result<Self> {
        let code = format!(
            "PTS{}{}",
            codec::encode_speed(pan.get())?,
            codec::encode_speed(tilt.get())?
        );
        Ok(Self::new(code, "pTS"))
    }

    /// Query the absolute pan/tilt position
    pub fn position() -> Self {
        Self::new("APC", "aPC")
    }

    /// Zoom to an absolute value
    pub fn zoom_to(zoom: u16) -> Result<Self> {
        Ok(Self::new(format!("AXZ{}", codec::encode_absolute(zoom)?), "axz"))
    }

    /// Start (or stop) a continuous zoom
    pub fn zoom_continuous(speed: ContinuousSpeed) -> Result<Self> {
        Ok(Self::new(format!("Z{}", codec::encode_speed(speed.get())?), "zS"))
    }

    /// Query the zoom value
    pub fn zoom() -> Self {
        Self::new("GZ", "gz")
    }

    /// Set the absolute focus value
    pub fn focus_to(focus: u16) -> Result<Self> {
        Ok(Self::new(format!("AXF{}", codec::encode_absolute(focus)?), "axf"))
    }

    /// Start (or stop) a continuous focus movement
    pub fn focus_continuous(speed: ContinuousSpeed) -> Result<Self> {
        Ok(Self::new(format!("F{}", codec::encode_speed(speed.get())?), "fS"))
    }

    /// Query the focus value
    pub fn focus() -> Self {
        Self::new("GF", "gf")
    }

    /// Switch autofocus on or off
    pub fn set_autofocus(on: bool) -> Self {
        Self::new(format!("D1{}", codec::encode_flag(on)), "d1")
    }

    /// Query whether autofocus is on
    pub fn autofocus() -> Self {
        Self::new("D1", "d1")
    }

    /// Set the absolute iris value
    pub fn iris_to(iris: u16) -> Result<Self> {
        Ok(Self::new(format!("AXI{}", codec::encode_absolute(iris)?), "axi"))
    }

    /// Start (or stop) a continuous iris movement
    pub fn iris_continuous(speed: ContinuousSpeed) -> Result<Self> {
        Ok(Self::new(format!("I{}", codec::encode_speed(speed.get())?), "iC"))
    }

    /// Query the iris value and auto iris flag
    pub fn iris() -> Self {
        Self::new("GI", "gi")
    }

    /// Switch auto iris on or off
    pub fn set_autoiris(on: bool) -> Self {
        Self::new(format!("D3{}", codec::encode_flag(on)), "d3")
    }

    /// Command code as sent to the device, without the `#` prefix
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Reply tag this command expects
    pub fn tag(&self) -> &'static str {
        self.tag
    }

    /// Query string for the `aw_ptz` CGI
    pub fn query(&self) -> String {
        format!("cmd={}{}&res=1", COMMAND_PREFIX, self.code)
    }

    /// Check the reply tag and return the payload that follows it
    ///
    /// A mismatch means the exchange is corrupted; nothing is guessed from
    /// the rest of the reply.
    pub fn payload<'a>(&self, response: &'a str) -> Result<&'a str> {
        let response = response.trim_end();
        response.strip_prefix(self.tag).ok_or_else(|| {
            ProtocolError::UnexpectedResponse {
                expected: self.tag,
                actual: response.to_string(),
            }
            .into()
        })
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.code)
    }
}
