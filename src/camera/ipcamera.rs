//! IP camera protocol client
//!
//! [`IpCamera`] runs every operation through the same steps:
//!
//! 1. build the command(s); bad parameters fail here, before the network
//! 2. acquire the camera's command slot (busy per policy)
//! 3. send, bounded by the command timeout
//! 4. check the reply tag; a mismatch is a protocol error
//! 5. decode the payload
//!
//! The slot guard lives on the stack of the operation, so it is released on
//! every exit path.

use crate::error::{ConnectionError, ProtocolError, Result};
use crate::protocol::{codec, Command};

use super::capability::{FocusingCamera, IrisCamera, MovingCamera, ZoomingCamera};
use super::config::CameraConfig;
use super::session::{CameraSession, SlotGuard};
use super::transport::{CommandTransport, HttpTransport};
use super::types::{
    ContinuousSpeed, FocusValue, IrisValue, PanSpeed, Position, TiltSpeed, ZoomPosition,
};

/// A camera speaking the `aw_ptz` protocol
#[derive(Debug)]
pub struct IpCamera<T> {
    config: CameraConfig,
    session: CameraSession,
    transport: T,
}

impl IpCamera<HttpTransport> {
    /// Create a camera reached over HTTP at `config.address`
    pub fn connect(config: CameraConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config.address, config.command_timeout)?;
        Ok(Self::new(config, transport))
    }
}

impl<T: CommandTransport> IpCamera<T> {
    /// Create a camera over an arbitrary transport
    pub fn new(config: CameraConfig, transport: T) -> Self {
        let session = CameraSession::new(config.name.clone(), config.busy_policy);
        Self {
            config,
            session,
            transport,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// The camera's command slot
    pub fn session(&self) -> &CameraSession {
        &self.session
    }

    /// Send one command while holding the slot and return its payload
    ///
    /// Taking the guard by reference ties the call to a held slot.
    async fn exchange(&self, _slot: &SlotGuard, command: &Command) -> Result<String> {
        let timeout = self.config.command_timeout;

        let response = match tokio::time::timeout(timeout, self.transport.send(command)).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(camera = %self.config.name, command = %command, "Camera did not reply in time");
                return Err(ConnectionError::Timeout(Some(timeout)).into());
            }
        };

        match command.payload(&response) {
            Ok(payload) => {
                tracing::trace!(camera = %self.config.name, command = %command, reply = %response, "Command completed");
                Ok(payload.to_string())
            }
            Err(e) => {
                tracing::warn!(camera = %self.config.name, command = %command, reply = %response, "Unexpected camera reply");
                Err(e)
            }
        }
    }

    /// Run a single command under a fresh slot acquisition
    async fn run(&self, command: Command) -> Result<String> {
        let slot = self.session.acquire().await?;
        self.exchange(&slot, &command).await
    }

    /// Run several commands back to back under one slot acquisition
    async fn run_all(&self, commands: &[Command]) -> Result<Vec<String>> {
        let slot = self.session.acquire().await?;
        let mut payloads = Vec::with_capacity(commands.len());
        for command in commands {
            payloads.push(self.exchange(&slot, command).await?);
        }
        Ok(payloads)
    }

    /// Position and zoom read under one slot acquisition
    pub async fn zoom_position(&self) -> Result<ZoomPosition> {
        let payloads = self.run_all(&[Command::position(), Command::zoom()]).await?;
        let position = decode_position(&payloads[0])?;
        let zoom = codec::decode_absolute(&payloads[1])?;
        Ok(ZoomPosition { position, zoom })
    }
}

/// Split an `aPC` payload into pan and tilt
fn decode_position(payload: &str) -> Result<Position> {
    let (pan, tilt) = match (payload.len(), payload.get(..4), payload.get(4..)) {
        (8, Some(pan), Some(tilt)) => (pan, tilt),
        _ => {
            return Err(ProtocolError::MalformedField {
                field: "position",
                value: payload.to_string(),
            }
            .into())
        }
    };
    Ok(Position::new(codec::decode_pan(pan)?, codec::decode_tilt(tilt)?))
}

/// Split a `gi` payload into iris value and auto iris flag
fn decode_iris(payload: &str) -> Result<IrisValue> {
    let (iris, flag) = match (payload.len(), payload.get(..3), payload.get(3..)) {
        (4, Some(iris), Some(flag)) => (iris, flag),
        _ => {
            return Err(ProtocolError::MalformedField {
                field: "iris",
                value: payload.to_string(),
            }
            .into())
        }
    };
    Ok(IrisValue::new(codec::decode_absolute(iris)?, codec::decode_flag(flag)?))
}

impl<T: CommandTransport> MovingCamera for IpCamera<T> {
    async fn move_to(&self, position: Position, pan_speed: PanSpeed, tilt_speed: TiltSpeed) -> Result<()> {
        self.run(Command::move_absolute(position, pan_speed, tilt_speed)?)
            .await
            .map(drop)
    }

    async fn move_continuous(&self, pan: ContinuousSpeed, tilt: ContinuousSpeed) -> Result<()> {
        self.run(Command::move_continuous(pan, tilt)?).await.map(drop)
    }

    async fn position(&self) -> Result<Position> {
        let payload = self.run(Command::position()).await?;
        decode_position(&payload)
    }
}

impl<T: CommandTransport> ZoomingCamera for IpCamera<T> {
    async fn zoom_to(&self, zoom: u16) -> Result<()> {
        self.run(Command::zoom_to(zoom)?).await.map(drop)
    }

    async fn zoom_continuous(&self, speed: ContinuousSpeed) -> Result<()> {
        self.run(Command::zoom_continuous(speed)?).await.map(drop)
    }

    async fn zoom(&self) -> Result<u16> {
        let payload = self.run(Command::zoom()).await?;
        codec::decode_absolute(&payload)
    }
}

impl<T: CommandTransport> FocusingCamera for IpCamera<T> {
    async fn set_focus(&self, value: FocusValue) -> Result<()> {
        let mut commands = vec![Command::set_autofocus(value.autofocus)];
        if !value.autofocus {
            commands.push(Command::focus_to(value.focus)?);
        }
        self.run_all(&commands).await.map(drop)
    }

    async fn set_autofocus(&self, on: bool) -> Result<()> {
        self.run(Command::set_autofocus(on)).await.map(drop)
    }

    async fn move_focus(&self, speed: ContinuousSpeed) -> Result<()> {
        self.run(Command::focus_continuous(speed)?).await.map(drop)
    }

    async fn focus(&self) -> Result<FocusValue> {
        let payloads = self.run_all(&[Command::focus(), Command::autofocus()]).await?;
        Ok(FocusValue::new(
            codec::decode_absolute(&payloads[0])?,
            codec::decode_flag(&payloads[1])?,
        ))
    }
}

impl<T: CommandTransport> IrisCamera for IpCamera<T> {
    async fn set_iris(&self, value: IrisValue) -> Result<()> {
        let mut commands = vec![Command::set_autoiris(value.autoiris)];
        if !value.autoiris {
            commands.push(Command::iris_to(value.iris)?);
        }
        self.run_all(&commands).await.map(drop)
    }

    async fn set_autoiris(&self, on: bool) -> Result<()> {
        self.run(Command::set_autoiris(on)).await.map(drop)
    }

    async fn move_iris(&self, speed: ContinuousSpeed) -> Result<()> {
        self.run(Command::iris_continuous(speed)?).await.map(drop)
    }

    async fn iris(&self) -> Result<IrisValue> {
        let payload = self.run(Command::iris()).await?;
        decode_iris(&payload)
    }
}
