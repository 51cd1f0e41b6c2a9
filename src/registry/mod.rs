//! Distributer registry
//!
//! The registry knows each camera's stream source and hands out that
//! camera's distributer, creating it for the first viewer.
//!
//! # Architecture
//!
//! ```text
//!                     Arc<DistributerRegistry>
//!                ┌──────────────────────────────┐
//!                │ sources: CameraId → url,kind │
//!                │ slots:   CameraId → Mutex<    │
//!                │   Option<Arc<Distributer>>>  │
//!                └──────────────┬───────────────┘
//!                               │ get_or_create()
//!         ┌─────────────────────┼─────────────────────┐
//!         ▼                     ▼                     ▼
//!   [Distributer 1]       [Distributer 2]       [Distributer 3]
//!    reader task           reader task           reader task
//!    ├─► Subscription      └─► Subscription      (no viewers,
//!    └─► Subscription                             upstream kept)
//! ```
//!
//! # Shared Payloads
//!
//! `bytes::Bytes` is reference counted, so every viewer of the same size
//! shares one allocation of each multipart part.

pub mod config;
pub mod entry;
pub mod store;

pub use config::{ReconnectPolicy, RegistryConfig};
pub use entry::{StreamSource, StreamType};
pub use store::DistributerRegistry;
