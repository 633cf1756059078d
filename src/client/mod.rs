//! Receiver side of clock distribution
//!
//! - [`ClockClient`] exchanges clock reads with a provider
//! - [`OffsetEstimator`] picks the best offset from recent exchanges
//! - [`NetClientClock`] exposes the estimated server clock
//! - [`Receiver`] binds playback sessions to that clock

pub mod config;
pub mod estimator;
pub mod net_clock;
pub mod receiver;

pub use config::ClientConfig;
pub use estimator::{ClockObservation, ClockOffsetEstimate, OffsetEstimator};
pub use net_clock::{ClockClient, NetClientClock, PollerHandle};
pub use receiver::Receiver;
