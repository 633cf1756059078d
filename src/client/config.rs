//! Clock client configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::protocol::constants::{
    DEFAULT_CLOCK_PORT, DEFAULT_REQUEST_TIMEOUT, DEFAULT_ROUND_TRIP_LIMIT,
};

/// Receiver-side clock synchronization options
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Clock provider address
    pub server_addr: SocketAddr,

    /// Timeout for a single clock-read request
    pub request_timeout: Duration,

    /// Attempts per exchange before giving up
    pub max_attempts: u32,

    /// Delay before the first retry (doubles on each retry)
    pub retry_backoff: Duration,

    /// Upper bound for the retry delay
    pub max_backoff: Duration,

    /// Successful exchanges in the initial synchronization burst
    pub initial_exchanges: usize,

    /// Exchanges with a longer round trip are discarded
    pub round_trip_limit: Duration,

    /// Number of recent exchanges the estimate is chosen from
    pub window_size: usize,

    /// Interval between background refinement exchanges
    pub poll_interval: Duration,

    /// Bound on the whole initial synchronization
    pub sync_timeout: Duration,

    /// Play from the local clock when synchronization fails
    pub fallback_to_local_clock: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_CLOCK_PORT)),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_attempts: 5,
            retry_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
            initial_exchanges: 3,
            round_trip_limit: DEFAULT_ROUND_TRIP_LIMIT,
            window_size: 8,
            poll_interval: Duration::from_secs(1),
            sync_timeout: Duration::from_secs(10),
            fallback_to_local_clock: false,
        }
    }
}

impl ClientConfig {
    /// Create a config for the given clock provider
    pub fn new(server_addr: SocketAddr) -> Self {
        Self {
            server_addr,
            ..Default::default()
        }
    }

    /// Set the per-request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set attempts per exchange (at least one)
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the initial retry delay
    pub fn retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Set the initial burst size (at least one)
    pub fn initial_exchanges(mut self, count: usize) -> Self {
        self.initial_exchanges = count.max(1);
        self
    }

    /// Set the outlier round-trip limit
    pub fn round_trip_limit(mut self, limit: Duration) -> Self {
        self.round_trip_limit = limit;
        self
    }

    /// Set the refinement window (at least one)
    pub fn window_size(mut self, size: usize) -> Self {
        self.window_size = size.max(1);
        self
    }

    /// Set the background poll interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the initial synchronization bound
    pub fn sync_timeout(mut self, timeout: Duration) -> Self {
        self.sync_timeout = timeout;
        self
    }

    /// Allow local-clock playback when synchronization fails
    pub fn fallback_to_local_clock(mut self, enabled: bool) -> Self {
        self.fallback_to_local_clock = enabled;
        self
    }

    /// Retry delay before attempt `attempt` (1-based, attempt 1 has none)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(attempt - 2).unwrap_or(u32::MAX);
        self.retry_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}
