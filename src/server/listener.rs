//! Stream server listener
//!
//! Binds the HTTP router and runs the registry's cleanup task alongside it.

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::error::Result;
use crate::registry::{DistributerRegistry, RegistryConfig};
use crate::server::config::ServerConfig;
use crate::server::handler::{router, AppState};
use crate::video::source::{HttpConnector, StreamConnector};

/// MJPEG stream server
pub struct StreamServer<C: StreamConnector> {
    config: ServerConfig,
    registry: Arc<DistributerRegistry<C>>,
}

impl StreamServer<HttpConnector> {
    /// Create a server reading upstreams over HTTP
    pub fn http(config: ServerConfig, registry_config: RegistryConfig) -> Result<Self> {
        let registry = DistributerRegistry::http(registry_config)?;
        Ok(Self::new(config, Arc::new(registry)))
    }
}

impl<C: StreamConnector> StreamServer<C> {
    /// Create a new server over an existing registry
    pub fn new(config: ServerConfig, registry: Arc<DistributerRegistry<C>>) -> Self {
        Self { config, registry }
    }

    /// Get a reference to the distributer registry
    pub fn registry(&self) -> &Arc<DistributerRegistry<C>> {
        &self.registry
    }

    /// Router for embedding the endpoint in another axum app
    pub fn router(&self) -> axum::Router {
        router(AppState::new(Arc::clone(&self.registry), self.config.max_viewers))
    }

    /// Run the server
    ///
    /// This method blocks until the server fails.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server until `shutdown` completes
    ///
    /// Viewers still connected at shutdown are not waited for: their
    /// streams never end on their own.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "MJPEG server listening");

        // Spawn cleanup task for the distributer registry
        let cleanup_handle = self.registry.spawn_cleanup_task();

        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = axum::serve(listener, self.router()).into_future() => result.map_err(Into::into),
        };

        // Stop cleanup task on shutdown
        cleanup_handle.abort();

        result
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::StreamSource;
    use crate::video::frame::CameraId;
    use crate::video::source::testing::{part, MockConnector};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn free_addr() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    }

    #[tokio::test]
    async fn test_serves_stream_over_tcp() {
        let connector = MockConnector::new("tcpb");
        let feed = connector.add_feed();
        let registry = Arc::new(DistributerRegistry::new(connector));
        registry
            .register_source(CameraId(5), StreamSource::mjpeg("http://cam5/stream"))
            .await;

        let addr = free_addr().await;
        let server = Arc::new(StreamServer::new(ServerConfig::with_addr(addr), registry));
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let running = Arc::clone(&server);
        let handle = tokio::spawn(async move {
            running
                .run_until(async {
                    let _ = stop_rx.await;
                })
                .await
        });

        let mut socket = None;
        for _ in 0..50 {
            if let Ok(s) = TcpStream::connect(addr).await {
                socket = Some(s);
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let mut socket = socket.expect("server did not start");

        socket
            .write_all(b"GET /camera/5/mjpeg HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();

        // Give the handler time to subscribe before the frame arrives
        tokio::time::sleep(Duration::from_millis(100)).await;
        feed.send(part("tcpb", b"over-the-wire")).unwrap();

        let mut received = Vec::new();
        let mut buf = [0u8; 1024];
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while !String::from_utf8_lossy(&received).contains("over-the-wire") {
            let n = tokio::time::timeout_at(deadline, socket.read(&mut buf))
                .await
                .unwrap()
                .unwrap();
            assert!(n > 0, "connection closed early");
            received.extend_from_slice(&buf[..n]);
        }

        let text = String::from_utf8_lossy(&received);
        assert!(text.starts_with("HTTP/1.1 200 OK"));
        assert!(text.contains("multipart/x-mixed-replace; boundary=tcpb"));

        stop_tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }
}
