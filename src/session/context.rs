//! Session context
//!
//! Read-only information about a receiver session, handed to pipeline
//! factories when they build the session's pipeline.

use std::net::SocketAddr;

/// Context for one receiver session
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Unique session ID
    pub session_id: u64,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Mount point the receiver requested
    pub mount: String,
}

impl SessionContext {
    /// Create a new context
    pub fn new(session_id: u64, peer_addr: SocketAddr, mount: impl Into<String>) -> Self {
        Self {
            session_id,
            peer_addr,
            mount: mount.into(),
        }
    }
}
