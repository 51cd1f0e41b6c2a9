//! Command transport
//!
//! A transport delivers one command and returns the raw reply. It knows
//! nothing about tags or telemetry; validation happens in the client.

use std::future::Future;
use std::time::Duration;

use crate::error::{ConnectionError, Result};
use crate::protocol::constants::COMMAND_PATH;
use crate::protocol::Command;

/// Delivers commands to a device
pub trait CommandTransport: Send + Sync {
    /// Send one command and return the device's raw reply
    fn send(&self, command: &Command) -> impl Future<Output = Result<String>> + Send;
}

/// HTTP transport for the `aw_ptz` CGI
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport for the camera at `address`
    ///
    /// `address` may be a bare host (`192.168.0.10`), a host and port, or a
    /// full `http://` URL.
    pub fn new(address: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self {
            base_url: base_url(address),
            client,
        })
    }

    /// Full request URL for a command
    pub fn url(&self, command: &Command) -> String {
        format!("{}{}?{}", self.base_url, COMMAND_PATH, command.query())
    }
}

fn base_url(address: &str) -> String {
    let address = address.trim().trim_end_matches('/');
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    }
}

impl CommandTransport for HttpTransport {
    async fn send(&self, command: &Command) -> Result<String> {
        let url = self.url(command);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConnectionError::Status(status.as_u16()).into());
        }

        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url() {
        let transport = HttpTransport::new("192.168.0.10", Duration::from_secs(1)).unwrap();
        assert_eq!(
            transport.url(&Command::zoom()),
            "http://192.168.0.10/cgi-bin/aw_ptz?cmd=%23GZ&res=1"
        );
    }

    #[test]
    fn test_base_url() {
        assert_eq!(base_url("cam.local:8080/"), "http://cam.local:8080");
        assert_eq!(base_url("https://cam.local"), "https://cam.local");
    }
}
