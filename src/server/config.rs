//! Server configuration

use std::net::SocketAddr;

use crate::protocol::constants::{DEFAULT_CLOCK_PORT, DEFAULT_RTSP_PORT};
use crate::session::OriginPolicy;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the clock provider binds to
    pub clock_addr: SocketAddr,

    /// Address advertised for RTSP sessions
    pub rtsp_addr: SocketAddr,

    /// Bind sessions to a local clock if the distributed clock is unusable
    pub fallback_to_local_clock: bool,

    /// Maximum concurrent sessions (0 = unlimited)
    pub max_sessions: usize,

    /// Running-time origin for session pipelines
    pub origin: OriginPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            clock_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_CLOCK_PORT)),
            rtsp_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_RTSP_PORT)),
            fallback_to_local_clock: false,
            max_sessions: 0, // Unlimited
            origin: OriginPolicy::Zero,
        }
    }
}

impl ServerConfig {
    /// Create a new config with a custom clock address
    pub fn with_clock_addr(addr: SocketAddr) -> Self {
        Self {
            clock_addr: addr,
            ..Default::default()
        }
    }

    /// Set the clock provider address
    pub fn clock_addr(mut self, addr: SocketAddr) -> Self {
        self.clock_addr = addr;
        self
    }

    /// Set the RTSP address
    pub fn rtsp_addr(mut self, addr: SocketAddr) -> Self {
        self.rtsp_addr = addr;
        self
    }

    /// Allow local-clock fallback for sessions
    pub fn fallback_to_local_clock(mut self, enabled: bool) -> Self {
        self.fallback_to_local_clock = enabled;
        self
    }

    /// Set maximum sessions
    pub fn max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max;
        self
    }

    /// Set the running-time origin policy
    pub fn origin(mut self, origin: OriginPolicy) -> Self {
        self.origin = origin;
        self
    }
}
