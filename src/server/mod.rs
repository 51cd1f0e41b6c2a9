//! HTTP server for MJPEG viewers

pub mod config;
pub mod handler;
pub mod listener;

pub use config::ServerConfig;
pub use handler::{camera_stream, router, AppState, StreamParams};
pub use listener::StreamServer;
