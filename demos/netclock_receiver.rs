//! Clock receiver example
//!
//! Run with: cargo run --example netclock_receiver [SERVER_CLOCK_ADDR]
//!
//! Start `netclock_server` first. The receiver synchronizes to the server
//! clock, binds a playback pipeline to it and keeps refining the offset.

use std::net::SocketAddr;
use std::time::Duration;

use netclock_rs::pipeline::PipelineDescription;
use netclock_rs::session::{Session, SessionContext};
use netclock_rs::{ClientConfig, Clock, Receiver};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let server_addr: SocketAddr = match std::env::args().nth(1) {
        Some(arg) => arg.replace("localhost", "127.0.0.1").parse()?,
        None => "127.0.0.1:8555".parse()?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("netclock_rs=debug".parse()?)
                .add_directive("netclock_receiver=debug".parse()?),
        )
        .init();

    let config = ClientConfig::new(server_addr).sync_timeout(Duration::from_secs(5));
    let mut receiver = Receiver::connect(config).await?;

    let rtsp_addr = SocketAddr::new(server_addr.ip(), 8554);
    let ctx = SessionContext::new(1, rtsp_addr, "/test");
    let pipeline = PipelineDescription::new("playback")
        .element("rtph264depay")
        .element("avdec_h264")
        .element("autovideosink")
        .build();
    let mut session = Session::new(ctx, Box::new(pipeline));

    if let Err(e) = receiver.attach(&mut session).await {
        eprintln!("Could not synchronize with {}: {}", server_addr, e);
        eprintln!("Session state: {}", session.state());
        std::process::exit(1);
    }

    if let Some(estimate) = receiver.estimate() {
        println!(
            "Synchronized: offset {} ns, round trip {:?}",
            estimate.offset_ns, estimate.round_trip
        );
    }

    let poller = receiver.spawn_poller();
    let clock = poller.clock();

    let mut ticker = tokio::time::interval(Duration::from_secs(2));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                println!(
                    "server clock {} running time {} rtt {:?}",
                    clock.now(),
                    session.running_time(),
                    clock.round_trip_time()
                );
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nShutting down...");
                break;
            }
        }
    }

    Ok(())
}
