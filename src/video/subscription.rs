//! Viewer subscriptions
//!
//! Each subscriber owns a bounded queue of ready-to-send multipart parts.
//! The distributer pushes into it; the viewer's connection drains it.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use bytes::Bytes;
use futures::Stream;
use tokio::sync::mpsc;

use super::frame::{CameraId, Resolution};

struct Sink {
    target: Option<Resolution>,
    tx: mpsc::Sender<Bytes>,
    alive: Arc<AtomicBool>,
}

/// Subscribers of one distributer
pub(crate) struct SubscriberSet {
    camera_id: CameraId,
    sinks: Mutex<HashMap<u64, Sink>>,
    next_id: AtomicU64,
}

impl SubscriberSet {
    pub(crate) fn new(camera_id: CameraId) -> Self {
        Self {
            camera_id,
            sinks: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, Sink>> {
        self.sinks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a subscriber with a queue of `capacity` parts
    pub(crate) fn insert(self: &Arc<Self>, target: Option<Resolution>, capacity: usize) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let alive = Arc::new(AtomicBool::new(true));

        self.lock().insert(
            id,
            Sink {
                target,
                tx,
                alive: Arc::clone(&alive),
            },
        );

        Subscription {
            id,
            camera_id: self.camera_id,
            target,
            rx,
            alive,
            set: Arc::downgrade(self),
        }
    }

    /// Remove a subscriber; `false` if it was already gone
    pub(crate) fn remove(&self, id: u64) -> bool {
        match self.lock().remove(&id) {
            Some(sink) => {
                sink.alive.store(false, Ordering::Release);
                true
            }
            None => false,
        }
    }

    /// Current subscribers with their targets and queues
    pub(crate) fn snapshot(&self) -> Vec<(u64, Option<Resolution>, mpsc::Sender<Bytes>)> {
        self.lock()
            .iter()
            .map(|(&id, sink)| (id, sink.target, sink.tx.clone()))
            .collect()
    }

    /// Remove every subscriber, ending their streams
    pub(crate) fn close_all(&self) -> usize {
        let drained: Vec<Sink> = self.lock().drain().map(|(_, sink)| sink).collect();
        for sink in &drained {
            sink.alive.store(false, Ordering::Release);
        }
        drained.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }
}

/// A viewer's handle on a distributer
///
/// Yields multipart parts in upstream order. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    camera_id: CameraId,
    target: Option<Resolution>,
    rx: mpsc::Receiver<Bytes>,
    alive: Arc<AtomicBool>,
    set: Weak<SubscriberSet>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn camera_id(&self) -> CameraId {
        self.camera_id
    }

    /// Requested size, `None` for original frames
    pub fn target(&self) -> Option<Resolution> {
        self.target
    }

    /// Whether the distributer still delivers to this subscription
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Next multipart part
    ///
    /// Returns `None` after the subscription was dropped for falling behind,
    /// unsubscribed, or its distributer died. Parts already queued are
    /// delivered first.
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }

    /// Stop receiving; safe to call more than once
    pub fn unsubscribe(&mut self) {
        if let Some(set) = self.set.upgrade() {
            if set.remove(self.id) {
                tracing::debug!(
                    camera = %self.camera_id,
                    subscriber = self.id,
                    "Viewer disconnected"
                );
            }
        }
        self.alive.store(false, Ordering::Release);
        self.rx.close();
    }

    /// Convert into a body stream for an HTTP response
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes, Infallible>> + Send {
        futures::stream::unfold(self, |mut subscription| async move {
            subscription.recv().await.map(|part| (Ok(part), subscription))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("camera_id", &self.camera_id)
            .field("target", &self.target)
            .field("alive", &self.is_alive())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unsubscribe_idempotent() {
        let set = Arc::new(SubscriberSet::new(CameraId(1)));
        let mut sub = set.insert(None, 4);
        let _other = set.insert(None, 4);
        assert_eq!(set.len(), 2);

        sub.unsubscribe();
        sub.unsubscribe();
        assert_eq!(set.len(), 1);
        assert!(!sub.is_alive());

        drop(sub);
        assert_eq!(set.len(), 1);
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let set = Arc::new(SubscriberSet::new(CameraId(1)));
        let sub = set.insert(None, 4);
        drop(sub);
        assert_eq!(set.len(), 0);
    }

    #[tokio::test]
    async fn test_removed_subscriber_drains_then_ends() {
        let set = Arc::new(SubscriberSet::new(CameraId(1)));
        let mut sub = set.insert(None, 4);

        let (_, _, tx) = set.snapshot().pop().unwrap();
        tx.try_send(Bytes::from_static(b"queued")).unwrap();
        drop(tx);

        assert!(set.remove(sub.id()));
        assert!(!sub.is_alive());
        assert_eq!(sub.recv().await, Some(Bytes::from_static(b"queued")));
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn test_close_all() {
        let set = Arc::new(SubscriberSet::new(CameraId(2)));
        let mut a = set.insert(None, 1);
        let mut b = set.insert(Some(Resolution::new(10, 10).unwrap()), 1);

        assert_eq!(set.close_all(), 2);
        assert_eq!(a.recv().await, None);
        assert_eq!(b.recv().await, None);
        assert!(!a.is_alive() && !b.is_alive());
    }

    #[test]
    fn test_unsubscribe_after_set_dropped() {
        let set = Arc::new(SubscriberSet::new(CameraId(3)));
        let mut sub = set.insert(None, 1);
        drop(set);
        sub.unsubscribe();
        assert!(!sub.is_alive());
    }
}
