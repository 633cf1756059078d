//! Statistics for the clock provider and session server

pub mod metrics;

pub use metrics::{ProviderCounters, ProviderStats, ServerStats, SessionCounters};
