//! Per-camera MJPEG fan-out
//!
//! A distributer owns the single upstream connection of one camera and
//! pushes every frame to all of its subscribers.
//!
//! ```text
//!                       ┌──► subscriber (original)  ──► viewer
//!  upstream ──► reader ─┼──► subscriber (320x240)   ──► viewer
//!                       └──► subscriber (320x240)   ──► viewer
//! ```
//!
//! Frames reach each subscriber in upstream order. A subscriber whose queue
//! stays full for longer than the push timeout is dropped, so one slow
//! viewer delays a frame by at most that long. When upstream drops the
//! reader reconnects with bounded backoff. Once the attempts run out the
//! distributer is dead: every subscription ends and the registry replaces
//! it on the next request.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use futures::future::join_all;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

use super::frame::{encode_part, CameraId, Frame, Resolution};
use super::reader::MjpegReader;
use super::resize::rescale;
use super::source::{ByteSource, StreamConnector};
use super::subscription::{SubscriberSet, Subscription};
use crate::error::Result;
use crate::registry::config::{ReconnectPolicy, RegistryConfig};
use crate::stats::metrics::{StreamCounters, StreamStats};

/// Fan-out of one camera's upstream to many viewers
pub struct Distributer {
    camera_id: CameraId,
    boundary: String,
    subscribers: Arc<SubscriberSet>,
    counters: Arc<StreamCounters>,
    alive: Arc<AtomicBool>,
    config: RegistryConfig,
    task: JoinHandle<()>,
}

impl Distributer {
    /// Start distributing from an already connected reader
    ///
    /// `connector` and `url` are used for reconnects.
    pub fn start<C: StreamConnector>(
        camera_id: CameraId,
        url: String,
        reader: MjpegReader<C::Source>,
        connector: Arc<C>,
        config: RegistryConfig,
    ) -> Self {
        let boundary = reader.boundary().to_string();
        let subscribers = Arc::new(SubscriberSet::new(camera_id));
        let counters = Arc::new(StreamCounters::new());
        let alive = Arc::new(AtomicBool::new(true));

        let pump = Pump {
            camera_id,
            boundary: boundary.clone(),
            subscribers: Arc::clone(&subscribers),
            counters: Arc::clone(&counters),
            alive: Arc::clone(&alive),
            config: config.clone(),
        };
        let task = tokio::spawn(pump.run(reader, connector, url));

        tracing::info!(camera = %camera_id, boundary = %boundary, "Distributer started");

        Self {
            camera_id,
            boundary,
            subscribers,
            counters,
            alive,
            config,
            task,
        }
    }

    pub fn camera_id(&self) -> CameraId {
        self.camera_id
    }

    /// Multipart boundary used for every downstream part
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Whether the upstream reader is still running
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Subscribe a viewer
    ///
    /// `None` receives original frames. With stream compression disabled a
    /// target is ignored and original frames are sent.
    pub fn subscribe(&self, target: Option<Resolution>) -> Subscription {
        let target = target.filter(|_| self.config.stream_compression);
        let subscription = self.subscribers.insert(target, self.config.subscriber_capacity);

        if !self.is_alive() {
            // Raced with the reader giving up; end the stream right away
            self.subscribers.remove(subscription.id());
        }

        tracing::debug!(
            camera = %self.camera_id,
            subscriber = subscription.id(),
            target = ?target,
            "Viewer subscribed"
        );
        subscription
    }

    /// Subscribe with raw width/height query values
    ///
    /// Invalid dimensions are rejected here, before anything is queued.
    pub fn subscribe_dimensions(&self, width: Option<&str>, height: Option<&str>) -> Result<Subscription> {
        let target = Resolution::parse(width, height)?;
        Ok(self.subscribe(target))
    }

    /// Remove a subscriber by id; `false` if it was already gone
    pub fn unsubscribe(&self, id: u64) -> bool {
        self.subscribers.remove(id)
    }

    pub fn stats(&self) -> StreamStats {
        self.counters
            .snapshot(self.camera_id, self.subscribers.len(), self.is_alive())
    }
}

impl Drop for Distributer {
    fn drop(&mut self) {
        self.task.abort();
        self.subscribers.close_all();
    }
}

impl std::fmt::Debug for Distributer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Distributer")
            .field("camera_id", &self.camera_id)
            .field("boundary", &self.boundary)
            .field("subscribers", &self.subscribers.len())
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// State of the reader task
struct Pump {
    camera_id: CameraId,
    boundary: String,
    subscribers: Arc<SubscriberSet>,
    counters: Arc<StreamCounters>,
    alive: Arc<AtomicBool>,
    config: RegistryConfig,
}

impl Pump {
    async fn run<C: StreamConnector>(self, mut reader: MjpegReader<C::Source>, connector: Arc<C>, url: String) {
        loop {
            self.read_until_dropped(&mut reader).await;

            match reconnect(&*connector, &url, &self.config.reconnect, self.camera_id).await {
                Some(next) => {
                    self.counters.record_reconnect();
                    reader = next;
                }
                None => break,
            }
        }

        tracing::error!(
            camera = %self.camera_id,
            subscribers = self.subscribers.len(),
            "Upstream lost, distributer stopped"
        );
    }

    async fn read_until_dropped<S: ByteSource>(&self, reader: &mut MjpegReader<S>) {
        loop {
            let next = match timeout(self.config.read_timeout, reader.next_frame()).await {
                Ok(next) => next,
                Err(_) => {
                    tracing::warn!(
                        camera = %self.camera_id,
                        timeout = ?self.config.read_timeout,
                        "Upstream stalled"
                    );
                    return;
                }
            };

            match next {
                Some(Ok(frame)) => self.distribute(frame).await,
                Some(Err(e)) => {
                    tracing::warn!(camera = %self.camera_id, error = %e, "Upstream read failed");
                    return;
                }
                None => {
                    tracing::info!(camera = %self.camera_id, "Upstream closed");
                    return;
                }
            }
        }
    }

    /// Push one frame to every subscriber
    async fn distribute(&self, frame: Frame) {
        self.counters.record_frame(frame.len());

        let sinks = self.subscribers.snapshot();
        if sinks.is_empty() {
            return;
        }

        let parts = self.render(&frame, sinks.iter().map(|(_, target, _)| *target)).await;

        let mut pending = Vec::new();
        for (id, target, tx) in sinks {
            let Some(part) = parts.get(&target) else {
                continue;
            };
            match tx.try_send(part.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(part)) => pending.push((id, tx, part)),
                Err(TrySendError::Closed(_)) => {
                    self.subscribers.remove(id);
                }
            }
        }

        if pending.is_empty() {
            return;
        }

        // Full queues wait together, so the frame is delayed by one push timeout at most
        let push_timeout = self.config.push_timeout;
        let results = join_all(pending.into_iter().map(|(id, tx, part)| async move {
            (id, tx.send_timeout(part, push_timeout).await.is_ok())
        }))
        .await;

        for (id, delivered) in results {
            if !delivered && self.subscribers.remove(id) {
                self.counters.record_dropped();
                tracing::warn!(
                    camera = %self.camera_id,
                    subscriber = id,
                    "Dropping slow viewer"
                );
            }
        }
    }

    /// Build the multipart part for every requested target
    ///
    /// Targets whose resize fails are missing from the result and skip this
    /// frame.
    async fn render(
        &self,
        frame: &Frame,
        targets: impl Iterator<Item = Option<Resolution>>,
    ) -> HashMap<Option<Resolution>, Bytes> {
        let mut parts = HashMap::new();
        let mut resize = Vec::new();

        for target in targets {
            match target {
                None => {
                    parts
                        .entry(None)
                        .or_insert_with(|| encode_part(&self.boundary, frame.data()));
                }
                Some(resolution) if !resize.contains(&resolution) => resize.push(resolution),
                Some(_) => {}
            }
        }

        if resize.is_empty() {
            return parts;
        }

        let data = frame.data().clone();
        let quality = self.config.jpeg_quality;
        let targets = resize.clone();
        match tokio::task::spawn_blocking(move || rescale(&data, &targets, quality)).await {
            Ok(Ok(resized)) => {
                self.counters.record_resized(resized.len());
                for (resolution, jpeg) in resized {
                    parts.insert(Some(resolution), encode_part(&self.boundary, &jpeg));
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(camera = %self.camera_id, error = %e, "Skipping frame for resized viewers");
            }
            Err(e) => {
                tracing::error!(camera = %self.camera_id, error = %e, "Resize task failed");
            }
        }

        parts
    }
}

impl Drop for Pump {
    // Runs on every exit of the reader task, including a panic or abort
    fn drop(&mut self) {
        self.alive.store(false, Ordering::Release);
        self.subscribers.close_all();
    }
}

/// Reconnect with bounded backoff; `None` once attempts are exhausted
async fn reconnect<C: StreamConnector>(
    connector: &C,
    url: &str,
    policy: &ReconnectPolicy,
    camera_id: CameraId,
) -> Option<MjpegReader<C::Source>> {
    for attempt in 1..=policy.max_attempts {
        let delay = policy.backoff(attempt);
        sleep(delay).await;

        match connector.connect(url).await {
            Ok(reader) => {
                tracing::info!(camera = %camera_id, attempt, "Reconnected to upstream");
                return Some(reader);
            }
            Err(e) => {
                tracing::warn!(
                    camera = %camera_id,
                    attempt,
                    max_attempts = policy.max_attempts,
                    error = %e,
                    "Upstream reconnect failed"
                );
            }
        }
    }
    None
}
