//! Distributer registry implementation
//!
//! Maps cameras to their live distributer. A distributer is created by the
//! first viewer and kept after the last one leaves, so the upstream
//! connection is not torn down and rebuilt as viewers come and go. It is
//! replaced only once its upstream has died for good.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use super::config::RegistryConfig;
use super::entry::StreamSource;
use crate::error::{Error, Result};
use crate::stats::metrics::StreamStats;
use crate::video::distributer::Distributer;
use crate::video::frame::CameraId;
use crate::video::source::{HttpConnector, StreamConnector};

/// One camera's distributer, guarded so concurrent first viewers connect once
type Slot = Arc<Mutex<Option<Arc<Distributer>>>>;

/// Central registry of camera sources and their distributers
///
/// Each camera has its own async slot: a slow upstream connect for one
/// camera holds only that camera's slot.
pub struct DistributerRegistry<C: StreamConnector> {
    connector: Arc<C>,

    /// Registered sources by camera
    sources: RwLock<HashMap<CameraId, StreamSource>>,

    /// Distributer slots by camera
    slots: RwLock<HashMap<CameraId, Slot>>,

    config: RegistryConfig,
}

impl DistributerRegistry<HttpConnector> {
    /// Create a registry reading upstreams over HTTP
    pub fn http(config: RegistryConfig) -> Result<Self> {
        let connector = HttpConnector::new(config.connect_timeout)?.max_frame_size(config.max_frame_size);
        Ok(Self::with_config(connector, config))
    }
}

impl<C: StreamConnector> DistributerRegistry<C> {
    /// Create a registry with default configuration
    pub fn new(connector: C) -> Self {
        Self::with_config(connector, RegistryConfig::default())
    }

    /// Create a registry with custom configuration
    pub fn with_config(connector: C, config: RegistryConfig) -> Self {
        Self {
            connector: Arc::new(connector),
            sources: RwLock::new(HashMap::new()),
            slots: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register or replace the stream source of a camera
    ///
    /// A running distributer keeps its upstream until it dies.
    pub async fn register_source(&self, camera: CameraId, source: StreamSource) {
        tracing::info!(camera = %camera, url = %source.url, kind = %source.kind, "Stream source registered");
        self.sources.write().await.insert(camera, source);
    }

    /// Forget a camera's source and stop its distributer
    pub async fn remove_source(&self, camera: CameraId) -> Option<StreamSource> {
        let source = self.sources.write().await.remove(&camera);
        let slot = self.slots.write().await.remove(&camera);
        if let Some(slot) = slot {
            slot.lock().await.take();
        }
        if source.is_some() {
            tracing::info!(camera = %camera, "Stream source removed");
        }
        source
    }

    /// Get the camera's distributer, starting one on first use
    ///
    /// Fails with `StreamUnavailable` for unknown or non-MJPEG cameras and
    /// with a connection error when upstream cannot be opened.
    pub async fn get_or_create(&self, camera: CameraId) -> Result<Arc<Distributer>> {
        let source = self
            .sources
            .read()
            .await
            .get(&camera)
            .filter(|source| source.is_distributable())
            .cloned()
            .ok_or(Error::StreamUnavailable(camera))?;

        let slot = self.slot(camera).await;
        let mut current = slot.lock().await;

        if let Some(distributer) = current.as_ref() {
            if distributer.is_alive() {
                return Ok(Arc::clone(distributer));
            }
            tracing::info!(camera = %camera, "Replacing dead distributer");
        }

        let reader = match self.connector.connect(&source.url).await {
            Ok(reader) => reader,
            Err(e) => {
                tracing::warn!(camera = %camera, url = %source.url, error = %e, "Upstream connect failed");
                return Err(e);
            }
        };

        let distributer = Arc::new(Distributer::start(
            camera,
            source.url,
            reader,
            Arc::clone(&self.connector),
            self.config.clone(),
        ));
        *current = Some(Arc::clone(&distributer));

        Ok(distributer)
    }

    /// Get the camera's distributer if one is running
    pub async fn get(&self, camera: CameraId) -> Option<Arc<Distributer>> {
        let slot = self.slots.read().await.get(&camera).cloned()?;
        let current = slot.lock().await;
        current.as_ref().filter(|d| d.is_alive()).cloned()
    }

    async fn slot(&self, camera: CameraId) -> Slot {
        if let Some(slot) = self.slots.read().await.get(&camera) {
            return Arc::clone(slot);
        }
        Arc::clone(self.slots.write().await.entry(camera).or_default())
    }

    /// Number of running distributers
    pub async fn distributer_count(&self) -> usize {
        let slots: Vec<Slot> = self.slots.read().await.values().cloned().collect();
        let mut count = 0;
        for slot in slots {
            if slot.lock().await.as_ref().is_some_and(|d| d.is_alive()) {
                count += 1;
            }
        }
        count
    }

    /// Statistics of a camera's running distributer
    pub async fn get_stream_stats(&self, camera: CameraId) -> Option<StreamStats> {
        self.get(camera).await.map(|d| d.stats())
    }

    /// Run cleanup once
    ///
    /// Releases distributers whose upstream died. Live distributers are
    /// kept regardless of viewer count.
    pub async fn cleanup(&self) {
        let slots: Vec<(CameraId, Slot)> = self
            .slots
            .read()
            .await
            .iter()
            .map(|(id, slot)| (*id, Arc::clone(slot)))
            .collect();

        for (camera, slot) in slots {
            // Skip slots busy connecting
            let Ok(mut current) = slot.try_lock() else {
                continue;
            };
            if current.as_ref().is_some_and(|d| !d.is_alive()) {
                current.take();
                tracing::info!(camera = %camera, "Dead distributer removed by cleanup");
            }
        }
    }

    /// Spawn background cleanup task
    pub fn spawn_cleanup_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);
        let interval = registry.config.cleanup_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                registry.cleanup().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::config::ReconnectPolicy;
    use crate::registry::entry::StreamType;
    use crate::video::source::testing::{part, payload_of, MockConnector};
    use std::time::Duration;

    const BOUNDARY: &str = "reg";

    fn registry(connector: MockConnector) -> DistributerRegistry<MockConnector> {
        let config = RegistryConfig::new().reconnect(ReconnectPolicy::disabled());
        DistributerRegistry::with_config(connector, config)
    }

    #[tokio::test]
    async fn test_unknown_camera_unavailable() {
        let registry = registry(MockConnector::new(BOUNDARY));

        let err = registry.get_or_create(CameraId(9)).await.unwrap_err();
        assert!(matches!(err, Error::StreamUnavailable(CameraId(9))));
        assert_eq!(registry.connector.connects(), 0);
    }

    #[tokio::test]
    async fn test_non_mjpeg_unavailable() {
        let registry = registry(MockConnector::new(BOUNDARY));
        registry
            .register_source(
                CameraId(1),
                StreamSource {
                    url: "rtsp://cam/stream".into(),
                    kind: StreamType::H264,
                },
            )
            .await;

        let err = registry.get_or_create(CameraId(1)).await.unwrap_err();
        assert!(matches!(err, Error::StreamUnavailable(_)));
    }

    #[tokio::test]
    async fn test_connect_failure_is_connection_error() {
        let registry = registry(MockConnector::new(BOUNDARY));
        registry
            .register_source(CameraId(1), StreamSource::mjpeg("http://cam/stream"))
            .await;

        let err = registry.get_or_create(CameraId(1)).await.unwrap_err();
        assert!(err.is_connection());
        assert!(registry.get(CameraId(1)).await.is_none());
    }

    #[tokio::test]
    async fn test_upstream_persists_without_viewers() {
        let connector = MockConnector::new(BOUNDARY);
        let feed = connector.add_feed();
        let registry = registry(connector);
        registry
            .register_source(CameraId(1), StreamSource::mjpeg("http://cam/stream"))
            .await;

        let first = registry.get_or_create(CameraId(1)).await.unwrap();
        let viewer = first.subscribe(None);
        drop(viewer);
        assert_eq!(first.subscriber_count(), 0);

        let second = registry.get_or_create(CameraId(1)).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.connector.connects(), 1);

        let mut viewer = second.subscribe(None);
        feed.send(part(BOUNDARY, b"frame")).unwrap();
        let part = viewer.recv().await.unwrap();
        assert_eq!(payload_of(&part), b"frame");
    }

    #[tokio::test]
    async fn test_concurrent_first_viewers_connect_once() {
        let connector = MockConnector::new(BOUNDARY);
        let _feed = connector.add_feed();
        let registry = Arc::new(registry(connector));
        registry
            .register_source(CameraId(1), StreamSource::mjpeg("http://cam/stream"))
            .await;

        let (a, b) = tokio::join!(
            registry.get_or_create(CameraId(1)),
            registry.get_or_create(CameraId(1))
        );

        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert_eq!(registry.connector.connects(), 1);
        assert_eq!(registry.distributer_count().await, 1);
    }

    #[tokio::test]
    async fn test_dead_distributer_replaced() {
        let connector = MockConnector::new(BOUNDARY);
        let feed = connector.add_feed();
        let registry = registry(connector);
        registry
            .register_source(CameraId(1), StreamSource::mjpeg("http://cam/stream"))
            .await;

        let first = registry.get_or_create(CameraId(1)).await.unwrap();
        let mut viewer = first.subscribe(None);

        drop(feed);
        assert_eq!(
            tokio::time::timeout(Duration::from_secs(2), viewer.recv())
                .await
                .unwrap(),
            None
        );
        assert!(!first.is_alive());
        assert!(registry.get(CameraId(1)).await.is_none());

        let _next_feed = registry.connector.add_feed();
        let second = registry.get_or_create(CameraId(1)).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(second.is_alive());
        assert_eq!(registry.connector.connects(), 2);
    }

    #[tokio::test]
    async fn test_cleanup_removes_dead() {
        let connector = MockConnector::new(BOUNDARY);
        let feed = connector.add_feed();
        let registry = registry(connector);
        registry
            .register_source(CameraId(1), StreamSource::mjpeg("http://cam/stream"))
            .await;

        let distributer = registry.get_or_create(CameraId(1)).await.unwrap();
        let mut viewer = distributer.subscribe(None);
        drop(feed);
        let _ = tokio::time::timeout(Duration::from_secs(2), viewer.recv()).await;
        drop(distributer);

        registry.cleanup().await;
        let slot = registry.slot(CameraId(1)).await;
        assert!(slot.lock().await.is_none());
    }

    #[tokio::test]
    async fn test_remove_source() {
        let connector = MockConnector::new(BOUNDARY);
        let _feed = connector.add_feed();
        let registry = registry(connector);
        registry
            .register_source(CameraId(3), StreamSource::mjpeg("http://cam/3"))
            .await;
        registry.get_or_create(CameraId(3)).await.unwrap();

        assert!(registry.remove_source(CameraId(3)).await.is_some());
        assert!(registry.get(CameraId(3)).await.is_none());
        assert!(matches!(
            registry.get_or_create(CameraId(3)).await,
            Err(Error::StreamUnavailable(_))
        ));
    }
}
