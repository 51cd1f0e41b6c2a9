//! Registry configuration
//!
//! Tunables shared by every distributer the registry creates: subscriber
//! queue depth, how long a full queue may stall a frame, upstream timeouts
//! and the reconnect policy.

use std::time::Duration;

use crate::video::reader::DEFAULT_MAX_FRAME_SIZE;

/// Bounded exponential backoff for upstream reconnects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Attempts after a drop before the distributer gives up
    pub max_attempts: u32,
    /// Delay before the first attempt
    pub initial_backoff: Duration,
    /// Upper bound on the delay between attempts
    pub max_backoff: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl ReconnectPolicy {
    /// Never reconnect
    pub fn disabled() -> Self {
        Self {
            max_attempts: 0,
            ..Default::default()
        }
    }

    /// Delay before attempt `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// Configuration for the distributer registry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Parts queued per subscriber before pushes start to wait
    pub subscriber_capacity: usize,

    /// How long one frame may wait on a full subscriber queue
    ///
    /// A subscriber still full after this is dropped.
    pub push_timeout: Duration,

    /// Timeout for establishing the upstream connection
    pub connect_timeout: Duration,

    /// Upstream silence after which the connection counts as dropped
    pub read_timeout: Duration,

    /// Upstream reconnect behaviour
    pub reconnect: ReconnectPolicy,

    /// Whether viewers may request resized frames
    ///
    /// When off, resize requests receive original frames.
    pub stream_compression: bool,

    /// JPEG quality of resized frames (1-100)
    pub jpeg_quality: u8,

    /// Interval for removing dead distributers
    pub cleanup_interval: Duration,

    /// Largest upstream part accepted before the connection is dropped
    pub max_frame_size: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            subscriber_capacity: 8,
            push_timeout: Duration::from_millis(100),
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(10),
            reconnect: ReconnectPolicy::default(),
            stream_compression: true,
            jpeg_quality: 80,
            cleanup_interval: Duration::from_secs(30),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

impl RegistryConfig {
    /// Create a new registry config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-subscriber queue capacity
    pub fn subscriber_capacity(mut self, capacity: usize) -> Self {
        self.subscriber_capacity = capacity;
        self
    }

    /// Set the push timeout for full subscriber queues
    pub fn push_timeout(mut self, timeout: Duration) -> Self {
        self.push_timeout = timeout;
        self
    }

    /// Set the upstream connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the upstream read timeout
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the reconnect policy
    pub fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Enable or disable resized streams
    pub fn stream_compression(mut self, enabled: bool) -> Self {
        self.stream_compression = enabled;
        self
    }

    /// Set the JPEG quality of resized frames
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Set the dead distributer cleanup interval
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Set the largest upstream part accepted
    pub fn max_frame_size(mut self, limit: usize) -> Self {
        self.max_frame_size = limit;
        self
    }
}
