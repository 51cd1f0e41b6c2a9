//! Camera configuration

use std::collections::HashMap;
use std::time::Duration;

use super::session::BusyPolicy;

/// Config key holding the device reply timeout in seconds
pub const TIMEOUT_KEY: &str = "IPCameraTimeOut";

/// Key/value configuration provider
///
/// Loading and storing configuration is the host application's business;
/// the camera layer only reads tunables through this trait.
pub trait ConfigSource {
    fn get_value(&self, key: &str) -> Option<String>;
}

impl ConfigSource for HashMap<String, String> {
    fn get_value(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Per-camera configuration
#[derive(Debug, Clone)]
pub struct CameraConfig {
    /// Name used in logs and busy errors
    pub name: String,

    /// Host (optionally with scheme and port) of the camera's control channel
    pub address: String,

    /// How long to wait for a reply to one command
    pub command_timeout: Duration,

    /// What happens to a command issued while another is in flight
    pub busy_policy: BusyPolicy,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            name: "camera".to_string(),
            address: "127.0.0.1".to_string(),
            command_timeout: Duration::from_secs(2),
            busy_policy: BusyPolicy::FailFast,
        }
    }
}

impl CameraConfig {
    /// Create a config for the camera at `address`
    pub fn with_address(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    /// Create a config for the camera at `address`, reading tunables from `source`
    ///
    /// Unparseable values are logged and the default is kept.
    pub fn from_source(address: impl Into<String>, source: &impl ConfigSource) -> Self {
        let mut config = Self::with_address(address);

        if let Some(raw) = source.get_value(TIMEOUT_KEY) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.command_timeout = Duration::from_secs(secs),
                _ => tracing::warn!(
                    key = TIMEOUT_KEY,
                    value = %raw,
                    default_secs = config.command_timeout.as_secs(),
                    "Ignoring invalid camera timeout"
                ),
            }
        }

        config
    }

    /// Set the camera name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the command reply timeout
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Set the busy policy
    pub fn busy_policy(mut self, policy: BusyPolicy) -> Self {
        self.busy_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CameraConfig::default();

        assert_eq!(config.command_timeout, Duration::from_secs(2));
        assert_eq!(config.busy_policy, BusyPolicy::FailFast);
    }

    #[test]
    fn test_builder_chaining() {
        let config = CameraConfig::with_address("10.0.0.5")
            .name("stage-left")
            .command_timeout(Duration::from_millis(500))
            .busy_policy(BusyPolicy::Wait(Duration::from_secs(1)));

        assert_eq!(config.address, "10.0.0.5");
        assert_eq!(config.name, "stage-left");
        assert_eq!(config.command_timeout, Duration::from_millis(500));
        assert_eq!(config.busy_policy, BusyPolicy::Wait(Duration::from_secs(1)));
    }

    #[test]
    fn test_from_source() {
        let mut values = HashMap::new();
        values.insert(TIMEOUT_KEY.to_string(), "5".to_string());

        let config = CameraConfig::from_source("10.0.0.5", &values);
        assert_eq!(config.command_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_from_source_invalid_keeps_default() {
        let mut values = HashMap::new();
        values.insert(TIMEOUT_KEY.to_string(), "soon".to_string());

        let config = CameraConfig::from_source("10.0.0.5", &values);
        assert_eq!(config.command_timeout, Duration::from_secs(2));

        let config = CameraConfig::from_source("10.0.0.5", &HashMap::new());
        assert_eq!(config.command_timeout, Duration::from_secs(2));
    }
}
