//! Statistics for distributed streams

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::video::frame::CameraId;

/// Live counters updated by a distributer's reader task
#[derive(Debug)]
pub(crate) struct StreamCounters {
    started_at: Instant,
    frames_received: AtomicU64,
    bytes_received: AtomicU64,
    frames_resized: AtomicU64,
    subscribers_dropped: AtomicU64,
    reconnects: AtomicU64,
}

impl StreamCounters {
    pub(crate) fn new() -> Self {
        Self {
            started_at: Instant::now(),
            frames_received: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            frames_resized: AtomicU64::new(0),
            subscribers_dropped: AtomicU64::new(0),
            reconnects: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_frame(&self, len: usize) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(len as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_resized(&self, count: usize) {
        self.frames_resized.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.subscribers_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, camera_id: CameraId, subscribers: usize, alive: bool) -> StreamStats {
        StreamStats {
            camera_id,
            started_at: self.started_at,
            frames_received: self.frames_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            frames_resized: self.frames_resized.load(Ordering::Relaxed),
            subscribers,
            subscribers_dropped: self.subscribers_dropped.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            alive,
        }
    }
}

/// Point-in-time statistics of one distributer
#[derive(Debug, Clone)]
pub struct StreamStats {
    /// Camera being distributed
    pub camera_id: CameraId,
    /// When the distributer started
    pub started_at: Instant,
    /// Frames read from upstream
    pub frames_received: u64,
    /// JPEG bytes read from upstream
    pub bytes_received: u64,
    /// Resized variants produced
    pub frames_resized: u64,
    /// Current subscriber count
    pub subscribers: usize,
    /// Subscribers dropped for falling behind
    pub subscribers_dropped: u64,
    /// Successful upstream reconnects
    pub reconnects: u64,
    /// Whether the reader task is still running
    pub alive: bool,
}

impl StreamStats {
    /// Time since the distributer started
    pub fn duration(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Upstream bitrate in bits per second
    pub fn bitrate(&self) -> u64 {
        let secs = self.duration().as_secs();
        if secs > 0 {
            (self.bytes_received * 8) / secs
        } else {
            0
        }
    }

    /// Average upstream framerate
    pub fn framerate(&self) -> f64 {
        let secs = self.duration().as_secs_f64();
        if secs > 0.0 {
            self.frames_received as f64 / secs
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_snapshot() {
        let counters = StreamCounters::new();
        counters.record_frame(100);
        counters.record_frame(50);
        counters.record_resized(2);
        counters.record_dropped();
        counters.record_reconnect();

        let stats = counters.snapshot(CameraId(7), 3, true);
        assert_eq!(stats.camera_id, CameraId(7));
        assert_eq!(stats.frames_received, 2);
        assert_eq!(stats.bytes_received, 150);
        assert_eq!(stats.frames_resized, 2);
        assert_eq!(stats.subscribers, 3);
        assert_eq!(stats.subscribers_dropped, 1);
        assert_eq!(stats.reconnects, 1);
        assert!(stats.alive);
    }

    #[test]
    fn test_rates_zero_duration() {
        let stats = StreamCounters::new().snapshot(CameraId(1), 0, true);
        assert_eq!(stats.bitrate(), 0);
        assert_eq!(stats.framerate(), 0.0);
    }

    #[test]
    fn test_bitrate() {
        let mut stats = StreamCounters::new().snapshot(CameraId(1), 0, true);
        stats.started_at = Instant::now() - Duration::from_secs(10);
        stats.bytes_received = 10_000;

        assert_eq!(stats.bitrate(), 8_000);
    }
}
