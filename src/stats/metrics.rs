//! Statistics and metrics for clock distribution and sessions

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Live counters updated by the clock provider task
#[derive(Debug, Default)]
pub struct ProviderCounters {
    requests_served: AtomicU64,
    malformed_packets: AtomicU64,
    ignored_inactive: AtomicU64,
}

impl ProviderCounters {
    pub fn record_served(&self) {
        self.requests_served.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.malformed_packets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ignored(&self) {
        self.ignored_inactive.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ProviderStats {
        ProviderStats {
            requests_served: self.requests_served.load(Ordering::Relaxed),
            malformed_packets: self.malformed_packets.load(Ordering::Relaxed),
            ignored_inactive: self.ignored_inactive.load(Ordering::Relaxed),
        }
    }
}

/// Clock provider statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderStats {
    /// Clock-read requests answered
    pub requests_served: u64,
    /// Datagrams dropped because they could not be decoded
    pub malformed_packets: u64,
    /// Requests dropped while the provider was inactive
    pub ignored_inactive: u64,
}

/// Live session counters kept by the server
#[derive(Debug, Default)]
pub struct SessionCounters {
    accepted: AtomicU64,
    active: AtomicU64,
    failed: AtomicU64,
}

impl SessionCounters {
    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
        self.active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_closed(&self) {
        let _ = self
            .active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn active(&self) -> u64 {
        self.active.load(Ordering::Relaxed)
    }
}

/// Server-wide statistics
#[derive(Debug, Clone, Default)]
pub struct ServerStats {
    /// Sessions that reached the synchronized state
    pub sessions_accepted: u64,
    /// Sessions currently alive
    pub active_sessions: u64,
    /// Sessions that ended in the failed state
    pub sessions_failed: u64,
    /// Clock provider statistics
    pub provider: ProviderStats,
    /// Uptime
    pub uptime: Duration,
}

impl ServerStats {
    pub fn collect(
        sessions: &SessionCounters,
        provider: &ProviderCounters,
        started_at: Instant,
    ) -> Self {
        Self {
            sessions_accepted: sessions.accepted.load(Ordering::Relaxed),
            active_sessions: sessions.active(),
            sessions_failed: sessions.failed.load(Ordering::Relaxed),
            provider: provider.snapshot(),
            uptime: started_at.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_counters() {
        let counters = ProviderCounters::default();
        counters.record_served();
        counters.record_served();
        counters.record_malformed();
        counters.record_ignored();

        let stats = counters.snapshot();
        assert_eq!(stats.requests_served, 2);
        assert_eq!(stats.malformed_packets, 1);
        assert_eq!(stats.ignored_inactive, 1);
    }

    #[test]
    fn test_session_counters() {
        let counters = SessionCounters::default();
        counters.record_accepted();
        counters.record_accepted();
        counters.record_closed();
        counters.record_failed();

        let stats = ServerStats::collect(&counters, &ProviderCounters::default(), Instant::now());
        assert_eq!(stats.sessions_accepted, 2);
        assert_eq!(stats.active_sessions, 1);
        assert_eq!(stats.sessions_failed, 1);
    }

    #[test]
    fn test_closed_never_underflows() {
        let counters = SessionCounters::default();
        counters.record_closed();
        assert_eq!(counters.active(), 0);
    }
}
