//! Clock distribution server example
//!
//! Run with: cargo run --example netclock_server [LAUNCH_LINE] [CLOCK_ADDR]
//!
//! Examples:
//!   cargo run --example netclock_server
//!   cargo run --example netclock_server "( videotestsrc ! x264enc ! rtph264pay name=pay0 pt=96 )"
//!   cargo run --example netclock_server "( audiotestsrc ! rtpL16pay name=pay0 )" localhost:9555
//!
//! Serves the `/test` mount and publishes the server clock. Every simulated
//! receiver session gets its own pipeline bound to that clock.
//!
//! ```text
//!   receivers ──UDP──► clock provider (8555)
//!             ──RTSP─► /test ──► factory ──► bind clock ──► RTP sync
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use netclock_rs::pipeline::PipelineDescription;
use netclock_rs::session::LaunchFactory;
use netclock_rs::{Clock, NetClockServer, ServerConfig};

const DEFAULT_LAUNCH: &str =
    "( videotestsrc is-live=true ! x264enc tune=zerolatency ! rtph264pay name=pay0 pt=96 )";

/// Parse the clock address from the command line.
///
/// Accepts "localhost", "localhost:PORT", "IP" and "IP:PORT".
fn parse_clock_addr(arg: &str) -> Result<SocketAddr, String> {
    const DEFAULT_PORT: u16 = 8555;

    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }
    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid clock address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

fn print_usage() {
    eprintln!("Usage: netclock_server [LAUNCH_LINE] [CLOCK_ADDR]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  LAUNCH_LINE  Pipeline served at /test (default: {})", DEFAULT_LAUNCH);
    eprintln!("  CLOCK_ADDR   Clock provider address (default: 0.0.0.0:8555)");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let launch = args.get(1).map(String::as_str).unwrap_or(DEFAULT_LAUNCH);

    let mut config = ServerConfig::default();
    if let Some(addr_str) = args.get(2) {
        match parse_clock_addr(addr_str) {
            Ok(addr) => config = config.clock_addr(addr),
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("netclock_rs=debug".parse()?)
                .add_directive("netclock_server=debug".parse()?),
        )
        .init();

    let server = NetClockServer::bind(config).await?;

    let description = PipelineDescription::from_launch("test", launch);
    if description.elements().is_empty() {
        eprintln!("Error: empty launch line");
        std::process::exit(1);
    }
    server
        .mounts()
        .add_factory("/test", Arc::new(LaunchFactory::new(description)))
        .await;

    println!("Clock provider on udp://{}", server.clock_addr());
    println!("Stream ready at {}", server.stream_url("/test"));
    println!();

    // Simulate one receiver session so the construction path is visible
    let session = server
        .accept_session("/test", "127.0.0.1:50000".parse()?)
        .await?;
    println!(
        "Session {} {} (running time {})",
        session.id(),
        session.state(),
        session.running_time()
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(5));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let stats = server.stats();
                tracing::info!(
                    clock = %server.clock().now(),
                    requests = stats.provider.requests_served,
                    sessions = stats.active_sessions,
                    "Server stats"
                );
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nShutting down...");
                break;
            }
        }
    }

    server.run_until(async {}).await?;
    Ok(())
}
