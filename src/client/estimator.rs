//! Clock offset estimation
//!
//! Each exchange yields a round-trip time and an offset estimate under the
//! symmetric-path assumption:
//!
//! ```text
//!   rtt    = t1 − t0
//!   server = v + rtt / 2          (server clock at t1)
//!   offset = server − t1
//! ```
//!
//! Of the exchanges in the refinement window, the one with the smallest
//! round trip is selected; ties go to the most recent.

use std::collections::VecDeque;
use std::time::Duration;

use crate::clock::ClockTime;

/// One completed clock exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockObservation {
    /// Local send time
    pub local_send: ClockTime,
    /// Server clock value from the reply
    pub server: ClockTime,
    /// Local receive time
    pub local_recv: ClockTime,
}

impl ClockObservation {
    pub fn new(local_send: ClockTime, server: ClockTime, local_recv: ClockTime) -> Self {
        Self {
            local_send,
            server,
            local_recv,
        }
    }

    /// Round-trip time, `None` if the local times are out of order
    pub fn round_trip(&self) -> Option<Duration> {
        if self.local_recv < self.local_send || self.server.is_none() {
            return None;
        }
        Some((self.local_recv - self.local_send).into())
    }
}

/// Receiver-side estimate of the server clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockOffsetEstimate {
    /// Server clock minus local clock, in nanoseconds
    pub offset_ns: i64,
    /// Round trip of the exchange this estimate came from
    pub round_trip: Duration,
    /// Local time the estimate was made at
    pub local_time: ClockTime,
    /// Exchange sequence number, increasing
    pub sequence: u64,
}

impl ClockOffsetEstimate {
    /// Derive an estimate from one exchange
    pub fn from_observation(observation: &ClockObservation, sequence: u64) -> Option<Self> {
        let round_trip = observation.round_trip()?;
        let half = ClockTime::from(round_trip / 2);
        let server_at_recv = observation.server + half;

        Some(Self {
            offset_ns: server_at_recv.signed_diff(observation.local_recv),
            round_trip,
            local_time: observation.local_recv,
            sequence,
        })
    }

    /// Half the round trip: bound on the error from path delay
    pub fn uncertainty(&self) -> Duration {
        self.round_trip / 2
    }

    /// Estimated server clock at a local time
    pub fn server_time(&self, local: ClockTime) -> ClockTime {
        local.offset_by(self.offset_ns)
    }
}

/// Smallest-round-trip-wins estimator over a sliding window
#[derive(Debug, Clone)]
pub struct OffsetEstimator {
    window: VecDeque<ClockOffsetEstimate>,
    window_size: usize,
    round_trip_limit: Duration,
    sequence: u64,
    discarded: u64,
}

impl OffsetEstimator {
    pub fn new(window_size: usize, round_trip_limit: Duration) -> Self {
        let window_size = window_size.max(1);
        Self {
            window: VecDeque::with_capacity(window_size),
            window_size,
            round_trip_limit,
            sequence: 0,
            discarded: 0,
        }
    }

    /// Record an exchange.
    ///
    /// Returns the estimate derived from it, or `None` if it was discarded
    /// as an outlier (round trip above the limit, or out-of-order times).
    pub fn observe(&mut self, observation: ClockObservation) -> Option<ClockOffsetEstimate> {
        self.sequence += 1;

        let estimate = match ClockOffsetEstimate::from_observation(&observation, self.sequence) {
            Some(estimate) if estimate.round_trip <= self.round_trip_limit => estimate,
            _ => {
                self.discarded += 1;
                tracing::debug!(
                    sequence = self.sequence,
                    rtt = ?observation.round_trip(),
                    limit = ?self.round_trip_limit,
                    "Discarding clock exchange"
                );
                return None;
            }
        };

        if self.window.len() == self.window_size {
            self.window.pop_front();
        }
        self.window.push_back(estimate);

        Some(estimate)
    }

    /// Selected estimate: smallest round trip, most recent on ties
    pub fn best(&self) -> Option<ClockOffsetEstimate> {
        self.window
            .iter()
            .copied()
            .min_by(|a, b| {
                a.round_trip
                    .cmp(&b.round_trip)
                    .then_with(|| b.sequence.cmp(&a.sequence))
            })
    }

    /// Exchanges currently in the window
    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Exchanges discarded as outliers
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    pub fn reset(&mut self) {
        self.window.clear();
    }
}
