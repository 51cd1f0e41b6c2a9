//! `aw_ptz` camera protocol
//!
//! Commands are short ASCII codes sent as a query string to the camera's
//! CGI endpoint. The reply is a short ASCII string whose leading tag
//! identifies the command it answers, followed by any telemetry fields.
//!
//! ```text
//!   GET /cgi-bin/aw_ptz?cmd=%23GZ&res=1
//!   <- gz655                  zoom = 0x655 - 0x555 = 256
//! ```

pub mod codec;
pub mod command;
pub mod constants;

pub use command::Command;
