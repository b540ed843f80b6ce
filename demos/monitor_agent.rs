//! Motion monitoring agent demo
//!
//! Run with: cargo run --example monitor_agent [BIND_ADDR] [OPTIONS]
//!
//! Examples:
//!   cargo run --example monitor_agent                         # ephemeral port on 127.0.0.1
//!   cargo run --example monitor_agent 0.0.0.0:7070
//!   cargo run --example monitor_agent --threshold 32 --min-percent 0.02
//!
//! The agent binds a broadcast server, writes the bound port to a discovery
//! file, and runs the frame pipeline against a synthetic camera (a bright
//! block that wanders across the frame, so motion fires on every comparison).
//! Connect a viewer with: cargo run --example frame_viewer
//!
//! Exit codes: 0 = clean shutdown, 1 = could not publish the discovery file
//! (or a pipeline configuration fault), 2 = could not remove the discovery
//! file at shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use motion_relay::{
    BroadcastConfig, BroadcastServer, CaptureError, DiscoveryFile, Frame, FrameSource,
    MotionPipeline, PipelineConfig, PixelGrid, PngCodec, Rgb,
};

const DEFAULT_PORT_FILE: &str = "motion-relay.port";

/// Synthetic camera: a bright 8x8 block that moves every capture
struct SyntheticSource {
    width: u32,
    height: u32,
    tick: AtomicU32,
}

impl SyntheticSource {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            tick: AtomicU32::new(0),
        }
    }
}

impl FrameSource for SyntheticSource {
    fn capture(&self) -> impl Future<Output = Result<Frame, CaptureError>> + Send {
        let tick = self.tick.fetch_add(1, Ordering::Relaxed);
        let offset = (tick * 8) % self.width;

        let mut grid = PixelGrid::new(self.width, self.height);
        for y in 0..8 {
            for x in 0..8 {
                grid.set_pixel((offset + x) % self.width, y, Rgb::new(255, 255, 255));
            }
        }

        let frame = Frame::new(grid);
        async move { Ok(frame) }
    }
}

fn parse_bind_addr(arg: &str) -> Result<SocketAddr, String> {
    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    // Bare IP gets an ephemeral port
    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, 0));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

fn print_usage() {
    eprintln!("Usage: monitor_agent [BIND_ADDR] [OPTIONS]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR              Address to bind to (default: 127.0.0.1:0)");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --port-file PATH       Discovery file path (default: {})", DEFAULT_PORT_FILE);
    eprintln!("  --raw                  Disable the length prefix on payloads");
    eprintln!("  --threshold N          Per-channel movement threshold, 0-255 (default: 64)");
    eprintln!("  --min-percent F        Detection minimum, 0.0-1.0 (default: 0.1)");
    eprintln!("  --acquire-secs N       Acquisition interval in seconds (default: 5)");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let mut bind_addr: SocketAddr = "127.0.0.1:0".parse()?;
    let mut port_file = DEFAULT_PORT_FILE.to_string();
    let mut framed = true;
    let mut config = PipelineConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port-file" => {
                i += 1;
                if let Some(path) = args.get(i) {
                    port_file = path.clone();
                }
            }
            "--raw" => framed = false,
            "--threshold" => {
                i += 1;
                // Out-of-range input is ignored and the default retained
                if let Some(Ok(v)) = args.get(i).map(|a| a.parse::<u8>()) {
                    config = config.movement_threshold(v);
                }
            }
            "--min-percent" => {
                i += 1;
                if let Some(Ok(v)) = args.get(i).map(|a| a.parse::<f64>()) {
                    config = config.detection_percent_min(v);
                }
            }
            "--acquire-secs" => {
                i += 1;
                if let Some(Ok(v)) = args.get(i).map(|a| a.parse::<u64>()) {
                    config = config.acquire_interval(Duration::from_secs(v));
                }
            }
            arg => match parse_bind_addr(arg) {
                Ok(addr) => bind_addr = addr,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    eprintln!();
                    print_usage();
                    std::process::exit(1);
                }
            },
        }
        i += 1;
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("motion_relay=debug".parse()?)
                .add_directive("monitor_agent=info".parse()?),
        )
        .init();

    let broadcast_config = BroadcastConfig::default()
        .bind(bind_addr)
        .write_length_prefix(framed);
    let server = BroadcastServer::bind(broadcast_config).await?;

    println!("Broadcasting on {}", server.local_addr());
    println!("Connect a viewer: cargo run --example frame_viewer -- --port-file {}", port_file);
    println!();

    let discovery = match DiscoveryFile::publish(&port_file, server.port()) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let mut events = server.events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            println!(
                "[{}] subscriber connected from {}",
                event.subscriber_id, event.peer_addr
            );
        }
    });

    let pipeline = MotionPipeline::new(config, SyntheticSource::new(64, 64), PngCodec, server);

    let result = pipeline
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
            println!("\nShutting down...");
        })
        .await;

    let stats = pipeline.stats();
    println!(
        "Stats: captured={} processed={} broadcasts={} dropped={} capture_failures={}",
        stats.frames_captured,
        stats.frames_processed,
        stats.broadcasts,
        stats.frames_dropped,
        stats.capture_failures,
    );

    if let Err(e) = discovery.remove() {
        eprintln!("Error: {}", e);
        std::process::exit(2);
    }

    result.map_err(Into::into)
}
