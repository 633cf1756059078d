//! Server side of clock distribution
//!
//! [`NetClockServer`] publishes its clock over UDP through a
//! [`NetTimeProvider`] and builds one synchronized pipeline per receiver
//! session from the factory attached to the requested mount point.

pub mod config;
pub mod listener;
pub mod mounts;
pub mod provider;

pub use config::ServerConfig;
pub use listener::NetClockServer;
pub use mounts::MountPoints;
pub use provider::{NetTimeProvider, ProviderHandle};
