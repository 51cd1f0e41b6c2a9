//! PTZ control example
//!
//! Run with: cargo run --example ptz_control CAMERA_ADDR [COMMAND]
//!
//! Commands:
//!   status                 print position, zoom, focus and iris (default)
//!   move PAN TILT          absolute move in degrees
//!   zoom VALUE             absolute zoom (0-2730)
//!   nudge SPEED MILLIS     continuous pan at SPEED (1-99, 50 = stop) for MILLIS
//!   autofocus on|off
//!
//! Examples:
//!   cargo run --example ptz_control 192.168.0.10
//!   cargo run --example ptz_control 192.168.0.10 move -30 10
//!   cargo run --example ptz_control 192.168.0.10 zoom 1200

use std::time::Duration;

use ptz_stream::camera::{
    BusyPolicy, CameraConfig, ContinuousSpeed, FocusingCamera, IpCamera, IrisCamera, MovingCamera,
    PanSpeed, Position, TiltSpeed, ZoomingCamera,
};

fn print_usage() {
    eprintln!("Usage: ptz_control CAMERA_ADDR [status | move PAN TILT | zoom VALUE | nudge SPEED MILLIS | autofocus on|off]");
}

fn arg<T: std::str::FromStr>(args: &[String], index: usize) -> Result<T, String> {
    let raw = args
        .get(index)
        .ok_or_else(|| format!("missing argument {}", index))?;
    raw.parse()
        .map_err(|_| format!("invalid argument '{}'", raw))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ptz_stream=debug".parse()?)
                .add_directive("ptz_control=debug".parse()?),
        )
        .init();

    let config = CameraConfig::with_address(args[0].as_str())
        .name(args[0].as_str())
        .busy_policy(BusyPolicy::Wait(Duration::from_secs(2)));
    let camera = IpCamera::connect(config)?;

    match args.get(1).map(String::as_str).unwrap_or("status") {
        "status" => {
            let position = camera.zoom_position().await?;
            let focus = camera.focus().await?;
            let iris = camera.iris().await?;
            println!(
                "pan={:.2} tilt={:.2} zoom={}",
                position.pan(),
                position.tilt(),
                position.zoom
            );
            println!("focus={} autofocus={}", focus.focus, focus.autofocus);
            println!("iris={} autoiris={}", iris.iris, iris.autoiris);
        }
        "move" => {
            let target = Position::new(arg(&args, 2)?, arg(&args, 3)?);
            camera
                .move_to(target, PanSpeed::MAX, TiltSpeed::Fast)
                .await?;
            println!("Moving to pan={} tilt={}", target.pan, target.tilt);
        }
        "zoom" => {
            let value: u16 = arg(&args, 2)?;
            camera.zoom_to(value).await?;
            println!("Zooming to {}", value);
        }
        "nudge" => {
            let speed = ContinuousSpeed::new(arg(&args, 2)?)?;
            let millis: u64 = arg(&args, 3)?;
            camera.move_continuous(speed, ContinuousSpeed::STOP).await?;
            tokio::time::sleep(Duration::from_millis(millis)).await;
            camera
                .move_continuous(ContinuousSpeed::STOP, ContinuousSpeed::STOP)
                .await?;
            println!("Nudged at speed {} for {}ms", speed.get(), millis);
        }
        "autofocus" => {
            let on = matches!(args.get(2).map(String::as_str), Some("on"));
            camera.set_autofocus(on).await?;
            println!("Autofocus {}", if on { "on" } else { "off" });
        }
        other => {
            eprintln!("Error: unknown command '{}'", other);
            print_usage();
            std::process::exit(1);
        }
    }

    Ok(())
}
