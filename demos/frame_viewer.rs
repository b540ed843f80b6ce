//! Framed-payload viewer demo
//!
//! Connects to a running monitor agent and consumes length-prefixed motion
//! payloads. The agent must be in framed mode (the default).
//!
//! Run with: cargo run --example frame_viewer [ADDR]
//!
//! Examples:
//!   cargo run --example frame_viewer                          # port from motion-relay.port
//!   cargo run --example frame_viewer 127.0.0.1:7070
//!   cargo run --example frame_viewer -- --port-file /tmp/agent.port

use std::net::SocketAddr;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

const DEFAULT_PORT_FILE: &str = "motion-relay.port";
const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

fn print_usage() {
    eprintln!("Usage: frame_viewer [ADDR] [--port-file PATH]");
    eprintln!();
    eprintln!("With no ADDR the agent's port is read from the discovery file");
    eprintln!("(default: {}).", DEFAULT_PORT_FILE);
}

fn addr_from_port_file(path: &str) -> Result<SocketAddr, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    let port: u16 = text.trim().parse()?;
    Ok(SocketAddr::new("127.0.0.1".parse()?, port))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let mut addr: Option<SocketAddr> = None;
    let mut port_file = DEFAULT_PORT_FILE.to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port-file" => {
                i += 1;
                if let Some(path) = args.get(i) {
                    port_file = path.clone();
                }
            }
            arg => match arg.replace("localhost", "127.0.0.1").parse() {
                Ok(parsed) => addr = Some(parsed),
                Err(_) => {
                    eprintln!("Error: invalid address '{}'", arg);
                    eprintln!();
                    print_usage();
                    std::process::exit(1);
                }
            },
        }
        i += 1;
    }

    let addr = match addr {
        Some(addr) => addr,
        None => addr_from_port_file(&port_file)?,
    };

    println!("Connecting to {}", addr);
    let mut stream = TcpStream::connect(addr).await?;
    println!("Connected; waiting for motion events");

    let mut received = 0u64;
    loop {
        let mut len_buf = [0u8; 2];
        if stream.read_exact(&mut len_buf).await.is_err() {
            println!("Server closed the connection after {} payloads", received);
            break;
        }
        let len = u16::from_le_bytes(len_buf) as usize;

        let mut payload = vec![0u8; len];
        if stream.read_exact(&mut payload).await.is_err() {
            println!("Connection dropped mid-payload");
            break;
        }
        received += 1;

        let kind = if payload.len() >= PNG_MAGIC.len() && payload[..8] == PNG_MAGIC {
            "png"
        } else {
            "opaque"
        };
        println!("Motion event {}: {} bytes ({})", received, len, kind);
    }

    Ok(())
}
