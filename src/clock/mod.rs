//! Clock types
//!
//! Running time in a session pipeline is always derived from one of these
//! clocks: the server's [`SystemClock`] directly, or on a receiver the
//! [`NetClientClock`](crate::client::NetClientClock) estimate of it.

pub mod source;
pub mod time;

pub use source::{Clock, ClockReading, SystemClock};
pub use time::ClockTime;
