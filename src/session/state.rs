//! Session synchronization state machine
//!
//! ```text
//!   Unbound ──bind──► BoundToDistributedClock ──override──► Synchronized
//!      │                        │                               │
//!      └────────────────────────┴──────────── fail ─────────────┴──► Failed
//! ```
//!
//! `Synchronized` and `Failed` are terminal except that a synchronized
//! session can still fail (for example on a rejected rebind).

/// Synchronization state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Session created, no clock assigned yet
    Unbound,
    /// Pipeline clock and running-time origin are bound
    BoundToDistributedClock,
    /// RTP sync prefers the pipeline clock; packets may flow
    Synchronized,
    /// Session must be torn down
    Failed,
}

impl SyncState {
    /// Transition after the pipeline clock is bound
    pub fn bind(&mut self) -> bool {
        if *self == SyncState::Unbound {
            *self = SyncState::BoundToDistributedClock;
            true
        } else {
            false
        }
    }

    /// Transition after the RTP sync override is applied
    pub fn synchronize(&mut self) -> bool {
        if *self == SyncState::BoundToDistributedClock {
            *self = SyncState::Synchronized;
            true
        } else {
            false
        }
    }

    /// Enter the failed state from anywhere
    pub fn fail(&mut self) {
        *self = SyncState::Failed;
    }

    /// Whether RTP packets may be synchronized and output produced
    pub fn can_output(&self) -> bool {
        *self == SyncState::Synchronized
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncState::Synchronized | SyncState::Failed)
    }
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SyncState::Unbound => "unbound",
            SyncState::BoundToDistributedClock => "bound",
            SyncState::Synchronized => "synchronized",
            SyncState::Failed => "failed",
        };
        f.write_str(name)
    }
}
