//! MJPEG HTTP endpoint
//!
//! `GET /camera/{id}/mjpeg?width=&height=` attaches the viewer to the
//! camera's distributer and streams multipart parts until the viewer goes
//! away. Dropping the response body drops the subscription, which
//! unsubscribes.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{Error, Result};
use crate::registry::DistributerRegistry;
use crate::video::frame::{CameraId, Resolution};
use crate::video::source::StreamConnector;
use crate::video::subscription::Subscription;

/// Route of the stream endpoint
pub const STREAM_ROUTE: &str = "/camera/:id/mjpeg";

pub const CACHE_CONTROL_VALUE: &str =
    "no-store, no-cache, must-revalidate, pre-check=0, post-check=0, max-age=0";
pub const EXPIRES_VALUE: &str = "Thu, 01 Dec 1994 16:00:00 GMT";

/// Query parameters of the stream endpoint
///
/// Kept as strings so malformed values reach validation instead of being
/// rejected by the extractor with a generic message.
#[derive(Debug, Default, Deserialize)]
pub struct StreamParams {
    pub width: Option<String>,
    pub height: Option<String>,
}

/// Shared state of the HTTP handlers
pub struct AppState<C: StreamConnector> {
    registry: Arc<DistributerRegistry<C>>,
    viewer_slots: Option<Arc<Semaphore>>,
}

impl<C: StreamConnector> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            viewer_slots: self.viewer_slots.clone(),
        }
    }
}

impl<C: StreamConnector> AppState<C> {
    /// `max_viewers` of 0 means unlimited
    pub fn new(registry: Arc<DistributerRegistry<C>>, max_viewers: usize) -> Self {
        let viewer_slots = (max_viewers > 0).then(|| Arc::new(Semaphore::new(max_viewers)));
        Self {
            registry,
            viewer_slots,
        }
    }

    pub fn registry(&self) -> &Arc<DistributerRegistry<C>> {
        &self.registry
    }
}

/// Router serving the stream endpoint
pub fn router<C: StreamConnector>(state: AppState<C>) -> Router {
    Router::new()
        .route(STREAM_ROUTE, get(camera_stream::<C>))
        .with_state(state)
}

/// Stream a camera's MJPEG feed to one viewer
pub async fn camera_stream<C: StreamConnector>(
    State(state): State<AppState<C>>,
    Path(camera): Path<u32>,
    Query(params): Query<StreamParams>,
) -> Response {
    let camera = CameraId(camera);
    match open_stream(&state, camera, &params).await {
        Ok(response) => response,
        Err(e) => error_response(camera, &e),
    }
}

async fn open_stream<C: StreamConnector>(
    state: &AppState<C>,
    camera: CameraId,
    params: &StreamParams,
) -> Result<Response> {
    // Validate before touching the registry or upstream
    let target = Resolution::parse(params.width.as_deref(), params.height.as_deref())?;

    let permit = match &state.viewer_slots {
        Some(slots) => match Arc::clone(slots).try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(_) => {
                tracing::warn!(camera = %camera, "Viewer rejected: limit reached");
                return Err(Error::ViewerLimit(camera));
            }
        },
        None => None,
    };

    let distributer = state.registry.get_or_create(camera).await?;
    let subscription = distributer.subscribe(target);

    Ok(mjpeg_response(distributer.boundary(), subscription, permit))
}

/// Build the streaming response for a subscription
///
/// `permit` is held until the body is dropped.
pub fn mjpeg_response(
    boundary: &str,
    subscription: Subscription,
    permit: Option<OwnedSemaphorePermit>,
) -> Response {
    let parts = subscription.into_stream().map(move |part| {
        let _held = &permit;
        part
    });

    (
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                format!("multipart/x-mixed-replace; boundary={}", boundary),
            ),
            (header::CACHE_CONTROL, CACHE_CONTROL_VALUE.to_string()),
            (header::CONNECTION, "keep-alive".to_string()),
            (header::PRAGMA, "no-cache".to_string()),
            (header::EXPIRES, EXPIRES_VALUE.to_string()),
        ],
        Body::from_stream(parts),
    )
        .into_response()
}

/// HTTP status for an error
pub fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::StreamUnavailable(_) => StatusCode::NOT_FOUND,
        Error::Connection(_) | Error::Protocol(_) => StatusCode::BAD_GATEWAY,
        Error::Busy(_) | Error::ViewerLimit(_) => StatusCode::SERVICE_UNAVAILABLE,
        Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(camera: CameraId, error: &Error) -> Response {
    let status = status_for(error);
    if status.is_server_error() {
        tracing::warn!(camera = %camera, status = status.as_u16(), error = %error, "Stream request failed");
    } else {
        tracing::debug!(camera = %camera, status = status.as_u16(), error = %error, "Stream request rejected");
    }
    (status, error.to_string()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ReconnectPolicy, RegistryConfig, StreamSource};
    use crate::video::source::testing::{part, payload_of, MockConnector};
    use bytes::Bytes;
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedSender;
    use tokio::time::timeout;

    const BOUNDARY: &str = "mjpegboundary";

    async fn state(max_viewers: usize) -> (AppState<MockConnector>, UnboundedSender<Bytes>) {
        let connector = MockConnector::new(BOUNDARY);
        let feed = connector.add_feed();
        let config = RegistryConfig::new().reconnect(ReconnectPolicy::disabled());
        let registry = Arc::new(DistributerRegistry::with_config(connector, config));
        registry
            .register_source(CameraId(1), StreamSource::mjpeg("http://cam1/stream"))
            .await;
        (AppState::new(registry, max_viewers), feed)
    }

    fn params(width: Option<&str>, height: Option<&str>) -> Query<StreamParams> {
        Query(StreamParams {
            width: width.map(String::from),
            height: height.map(String::from),
        })
    }

    async fn request(state: &AppState<MockConnector>, camera: u32, query: Query<StreamParams>) -> Response {
        camera_stream(State(state.clone()), Path(camera), query).await
    }

    #[tokio::test]
    async fn test_stream_headers() {
        let (state, _feed) = state(0).await;
        let response = request(&state, 1, params(None, None)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(
            headers[header::CONTENT_TYPE],
            "multipart/x-mixed-replace; boundary=mjpegboundary"
        );
        assert_eq!(headers[header::CACHE_CONTROL], CACHE_CONTROL_VALUE);
        assert_eq!(headers[header::CONNECTION], "keep-alive");
        assert_eq!(headers[header::PRAGMA], "no-cache");
        assert_eq!(headers[header::EXPIRES], EXPIRES_VALUE);
    }

    #[tokio::test]
    async fn test_stream_body_and_disconnect() {
        let (state, feed) = state(0).await;
        let response = request(&state, 1, params(None, None)).await;
        let mut body = response.into_body().into_data_stream();

        feed.send(part(BOUNDARY, b"jpeg-1")).unwrap();
        let chunk = timeout(Duration::from_secs(2), body.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(payload_of(&chunk), b"jpeg-1");

        let distributer = state.registry().get(CameraId(1)).await.unwrap();
        assert_eq!(distributer.subscriber_count(), 1);

        drop(body);
        assert_eq!(distributer.subscriber_count(), 0);
        // Upstream stays up for the next viewer
        assert!(distributer.is_alive());
    }

    #[tokio::test]
    async fn test_unknown_camera_not_found() {
        let (state, _feed) = state(0).await;
        let response = request(&state, 42, params(None, None)).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_dimensions_bad_request() {
        let (state, _feed) = state(0).await;

        for (w, h) in [(Some("abc"), Some("10")), (Some("0"), Some("10")), (Some("320"), None)] {
            let response = request(&state, 1, params(w, h)).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }

        // Nothing was connected for rejected requests
        assert!(state.registry().get(CameraId(1)).await.is_none());
    }

    #[tokio::test]
    async fn test_upstream_failure_bad_gateway() {
        let connector = MockConnector::new(BOUNDARY);
        let registry = Arc::new(DistributerRegistry::new(connector));
        registry
            .register_source(CameraId(2), StreamSource::mjpeg("http://down/stream"))
            .await;
        let state = AppState::new(registry, 0);

        let response = request(&state, 2, params(None, None)).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_viewer_limit() {
        let (state, _feed) = state(1).await;

        let first = request(&state, 1, params(None, None)).await;
        assert_eq!(first.status(), StatusCode::OK);

        let second = request(&state, 1, params(None, None)).await;
        assert_eq!(second.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = axum::body::to_bytes(second.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], Error::ViewerLimit(CameraId(1)).to_string().as_bytes());

        drop(first);
        let third = request(&state, 1, params(None, None)).await;
        assert_eq!(third.status(), StatusCode::OK);
    }

    #[test]
    fn test_status_mapping() {
        use crate::error::{ConnectionError, ValidationError};

        assert_eq!(
            status_for(&ValidationError::IncompleteDimensions.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&Error::StreamUnavailable(CameraId(1))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&ConnectionError::UpstreamClosed.into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&Error::ViewerLimit(CameraId(1))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&Error::Busy("cam1".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
