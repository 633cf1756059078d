//! netclock-rs: network clock distribution for synchronized RTSP playback
//!
//! A server publishes its clock over UDP and binds every session pipeline to
//! it with a zero running-time origin. Receivers estimate the server clock
//! from request/reply exchanges, bind their playback pipelines to that
//! estimate and route RTP synchronization through the pipeline clock instead
//! of RTCP sender reports. Sessions that share the clock report the same
//! running time for the same clock value.
//!
//! # Server
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use netclock_rs::pipeline::PipelineDescription;
//! use netclock_rs::session::LaunchFactory;
//! use netclock_rs::{NetClockServer, ServerConfig};
//!
//! # async fn run() -> netclock_rs::Result<()> {
//! let server = NetClockServer::bind(ServerConfig::default()).await?;
//! let description = PipelineDescription::new("test")
//!     .element("videotestsrc")
//!     .element("rtph264pay");
//! server
//!     .mounts()
//!     .add_factory("/test", Arc::new(LaunchFactory::new(description)))
//!     .await;
//!
//! let session = server
//!     .accept_session("/test", "192.168.1.20:50000".parse().unwrap())
//!     .await?;
//! assert!(session.can_output());
//! # Ok(())
//! # }
//! ```
//!
//! # Receiver
//!
//! ```no_run
//! use netclock_rs::pipeline::PipelineDescription;
//! use netclock_rs::session::{Session, SessionContext};
//! use netclock_rs::{ClientConfig, Receiver};
//!
//! # async fn run() -> netclock_rs::Result<()> {
//! let config = ClientConfig::new("192.168.1.10:8555".parse().unwrap());
//! let mut receiver = Receiver::connect(config).await?;
//!
//! let ctx = SessionContext::new(1, "192.168.1.10:8554".parse().unwrap(), "/test");
//! let mut session = Session::new(ctx, Box::new(PipelineDescription::new("playback").build()));
//! receiver.attach(&mut session).await?;
//!
//! let _poller = receiver.spawn_poller();
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod clock;
pub mod error;
pub mod pipeline;
pub mod protocol;
pub mod server;
pub mod session;
pub mod stats;

pub use client::{ClientConfig, ClockClient, NetClientClock, Receiver};
pub use clock::{Clock, ClockTime, SystemClock};
pub use error::{Error, Result};
pub use server::{NetClockServer, ServerConfig};
pub use session::{Session, SyncState};
