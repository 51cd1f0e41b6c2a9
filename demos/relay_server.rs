//! MJPEG relay server
//!
//! Reads each camera's MJPEG stream once and serves it to any number of
//! viewers, optionally resized.
//!
//! Run with: cargo run --example relay_server [BIND_ADDR] ID=URL...
//!
//! Examples:
//!   cargo run --example relay_server 1=http://192.168.0.10/cgi-bin/mjpeg
//!   cargo run --example relay_server localhost:9000 1=http://cam1/mjpeg 2=http://cam2/mjpeg
//!
//! ## Viewing
//!
//! In a browser:
//!   <img src="http://localhost:8888/camera/1/mjpeg">
//!   <img src="http://localhost:8888/camera/1/mjpeg?width=320&height=180">
//!
//! With ffplay:
//!   ffplay -f mjpeg http://localhost:8888/camera/1/mjpeg

use std::net::SocketAddr;
use std::time::Duration;

use ptz_stream::registry::{RegistryConfig, StreamSource};
use ptz_stream::{CameraId, ServerConfig, StreamServer};

const DEFAULT_PORT: u16 = 8888;

/// Parse bind address from command line argument.
///
/// Accepts formats:
/// - "localhost" -> 127.0.0.1:8888
/// - "localhost:9000" -> 127.0.0.1:9000
/// - "127.0.0.1" -> 127.0.0.1:8888
/// - "0.0.0.0:8888" -> 0.0.0.0:8888
fn parse_bind_addr(arg: &str) -> Result<SocketAddr, String> {
    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

/// Parse a camera source of the form "ID=URL".
fn parse_source(arg: &str) -> Option<(CameraId, String)> {
    let (id, url) = arg.split_once('=')?;
    let id = id.trim().parse::<u32>().ok()?;
    Some((CameraId(id), url.trim().to_string()))
}

fn print_usage() {
    eprintln!("Usage: relay_server [BIND_ADDR] ID=URL...");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR    Address to bind to (default: 0.0.0.0:{})", DEFAULT_PORT);
    eprintln!("  ID=URL       Camera id and its MJPEG stream URL");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  relay_server 1=http://192.168.0.10/cgi-bin/mjpeg");
    eprintln!("  relay_server localhost:9000 1=http://cam1/mjpeg 2=http://cam2/mjpeg");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let mut bind_addr = SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT));
    let mut sources = Vec::new();
    for (i, arg) in args.iter().enumerate() {
        if let Some(source) = parse_source(arg) {
            sources.push(source);
            continue;
        }
        match (i, parse_bind_addr(arg)) {
            (0, Ok(addr)) => bind_addr = addr,
            (_, Err(e)) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
            (_, Ok(_)) => {
                eprintln!("Error: bind address must come first");
                std::process::exit(1);
            }
        }
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ptz_stream=debug".parse()?)
                .add_directive("relay_server=debug".parse()?),
        )
        .init();

    let registry_config = RegistryConfig::default()
        .subscriber_capacity(4)
        .push_timeout(Duration::from_millis(200));
    let server = StreamServer::http(ServerConfig::with_addr(bind_addr), registry_config)?;

    for (camera, url) in sources {
        println!("Camera {} <- {}", camera, url);
        server
            .registry()
            .register_source(camera, StreamSource::mjpeg(url))
            .await;
    }

    println!();
    println!("Starting MJPEG relay on {}", bind_addr);
    println!("View: http://{}/camera/<ID>/mjpeg[?width=W&height=H]", bind_addr);
    println!();

    // Run with Ctrl+C handling
    let result = server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
            println!("\nShutting down...");
        })
        .await;

    if let Err(e) = result {
        eprintln!("Server error: {}", e);
    }

    Ok(())
}
