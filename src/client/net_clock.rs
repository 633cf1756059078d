//! Network client clock
//!
//! [`ClockClient`] runs the request/reply exchanges against a clock provider
//! and feeds an [`OffsetEstimator`]. [`NetClientClock`] is the read side: a
//! [`Clock`] reporting the local clock shifted by the selected offset.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::clock::{Clock, ClockTime, SystemClock};
use crate::error::{Error, ProtocolError, Result, TransportError};
use crate::protocol::constants::PACKET_SIZE;
use crate::protocol::ClockPacket;

use super::config::ClientConfig;
use super::estimator::{ClockObservation, ClockOffsetEstimate, OffsetEstimator};

/// Receiver-side estimate of the server clock
///
/// Reads are lock-free. Until the first successful exchange the clock is
/// unsynchronized and reports plain local time.
pub struct NetClientClock {
    local: SystemClock,
    name: String,
    offset_ns: AtomicI64,
    estimate: RwLock<Option<ClockOffsetEstimate>>,
    last: AtomicU64,
    synced: AtomicBool,
    synced_tx: watch::Sender<bool>,
}

impl NetClientClock {
    fn new(server_addr: SocketAddr) -> Self {
        let (synced_tx, _) = watch::channel(false);
        Self {
            local: SystemClock::with_name("net-client-local"),
            name: format!("net-client({})", server_addr),
            offset_ns: AtomicI64::new(0),
            estimate: RwLock::new(None),
            last: AtomicU64::new(0),
            synced: AtomicBool::new(false),
            synced_tx,
        }
    }

    /// Local clock the offset applies to
    pub fn local_time(&self) -> ClockTime {
        self.local.now()
    }

    /// Current offset (server minus local) in nanoseconds
    pub fn offset_ns(&self) -> i64 {
        self.offset_ns.load(Ordering::Acquire)
    }

    /// Estimate currently applied, offset and round trip together
    pub fn estimate(&self) -> Option<ClockOffsetEstimate> {
        *self.estimate.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Round trip of the selected exchange
    pub fn round_trip_time(&self) -> Option<Duration> {
        self.estimate().map(|estimate| estimate.round_trip)
    }

    /// Wait until the first successful exchange, at most `timeout`
    pub async fn wait_for_sync(&self, timeout: Duration) -> Result<()> {
        let mut rx = self.synced_tx.subscribe();
        let synced = tokio::time::timeout(timeout, rx.wait_for(|synced| *synced))
            .await
            .map(|changed| changed.is_ok());

        match synced {
            Ok(true) => Ok(()),
            _ => Err(Error::SynchronizationTimeout(timeout)),
        }
    }

    fn apply(&self, estimate: &ClockOffsetEstimate) {
        *self.estimate.write().unwrap_or_else(|e| e.into_inner()) = Some(*estimate);
        self.offset_ns.store(estimate.offset_ns, Ordering::Release);

        if !self.synced.swap(true, Ordering::AcqRel) {
            tracing::info!(
                clock = %self.name,
                offset_ns = estimate.offset_ns,
                rtt = ?estimate.round_trip,
                "Network clock synchronized"
            );
            self.synced_tx.send_replace(true);
        }
    }
}

impl Clock for NetClientClock {
    fn now(&self) -> ClockTime {
        // Plain local time until synchronized; it must not hold back the clamp
        if !self.is_synced() {
            return self.local.now();
        }

        let estimated = self.local.now().offset_by(self.offset_ns());
        // A refined offset may be smaller than the previous one
        let prev = self.last.fetch_max(estimated.nanos(), Ordering::AcqRel);
        ClockTime::from_nanos(prev.max(estimated.nanos()))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_synced(&self) -> bool {
        self.synced.load(Ordering::Acquire)
    }
}

/// Performs clock exchanges with one provider
pub struct ClockClient {
    config: ClientConfig,
    socket: UdpSocket,
    estimator: OffsetEstimator,
    clock: Arc<NetClientClock>,
}

impl ClockClient {
    /// Open a socket towards the clock provider
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let bind_addr: SocketAddr = if config.server_addr.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket
            .connect(config.server_addr)
            .await
            .map_err(|_| TransportError::Unreachable(config.server_addr))?;

        tracing::debug!(server = %config.server_addr, "Clock client connected");

        Ok(Self {
            estimator: OffsetEstimator::new(config.window_size, config.round_trip_limit),
            clock: Arc::new(NetClientClock::new(config.server_addr)),
            socket,
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Shared handle to the estimated server clock
    pub fn clock(&self) -> Arc<NetClientClock> {
        Arc::clone(&self.clock)
    }

    /// Currently selected estimate
    pub fn estimate(&self) -> Option<ClockOffsetEstimate> {
        self.estimator.best()
    }

    /// Perform one request/reply exchange.
    ///
    /// Replies that do not carry this request's token are stale and ignored.
    pub async fn exchange(&mut self) -> Result<ClockObservation> {
        let local_send = self.clock.local_time();
        let token = local_send.nanos();

        self.socket.send(&ClockPacket::request(token).encode()).await?;

        let deadline = Instant::now() + self.config.request_timeout;
        let mut buf = [0u8; PACKET_SIZE * 4];

        loop {
            let len = match tokio::time::timeout_at(deadline, self.socket.recv(&mut buf)).await {
                Ok(Ok(len)) => len,
                Ok(Err(_)) => return Err(TransportError::Unreachable(self.config.server_addr).into()),
                Err(_) => {
                    return Err(TransportError::RequestTimeout(self.config.request_timeout).into())
                }
            };
            let local_recv = self.clock.local_time();

            match ClockPacket::decode_reply(&buf[..len], token) {
                Ok(reply) => return Ok(ClockObservation::new(local_send, reply.clock, local_recv)),
                Err(ProtocolError::TokenMismatch { actual, .. }) => {
                    tracing::trace!(token = actual, "Ignoring stale clock reply");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Exchange with retry and backoff, then update the estimate.
    ///
    /// Returns the newly selected estimate, or `None` if the exchange was
    /// discarded as an outlier.
    pub async fn refine(&mut self) -> Result<Option<ClockOffsetEstimate>> {
        let mut attempt = 0;

        let observation = loop {
            attempt += 1;
            tokio::time::sleep(self.config.backoff_for(attempt)).await;

            match self.exchange().await {
                Ok(observation) => break observation,
                Err(e) if e.is_retryable() && attempt < self.config.max_attempts => {
                    tracing::debug!(attempt = attempt, error = %e, "Clock exchange failed, retrying");
                }
                Err(e) if e.is_retryable() => {
                    tracing::warn!(attempts = attempt, error = %e, "Clock exchange failed");
                    return Err(TransportError::RetriesExhausted { attempts: attempt }.into());
                }
                Err(e) => return Err(e),
            }
        };

        if self.estimator.observe(observation).is_none() {
            return Ok(None);
        }
        let best = self.estimator.best();
        if let Some(best) = &best {
            self.clock.apply(best);
        }

        tracing::trace!(
            rtt = ?observation.round_trip(),
            selected_rtt = ?best.map(|b| b.round_trip),
            "Clock exchange completed"
        );
        Ok(best)
    }

    /// Run the initial synchronization burst.
    ///
    /// Completes once `initial_exchanges` exchanges succeeded, or earlier
    /// with the best estimate so far if retries run out after at least one
    /// success. Bounded by `sync_timeout`.
    pub async fn synchronize(&mut self) -> Result<ClockOffsetEstimate> {
        let window = self.config.sync_timeout;

        match tokio::time::timeout(window, self.burst()).await {
            Ok(result) => result,
            Err(_) => match self.estimator.best() {
                Some(best) => Ok(best),
                None => Err(Error::SynchronizationTimeout(window)),
            },
        }
    }

    async fn burst(&mut self) -> Result<ClockOffsetEstimate> {
        let mut completed = 0;

        while completed < self.config.initial_exchanges {
            match self.refine().await {
                Ok(Some(_)) => completed += 1,
                Ok(None) => {}
                Err(e) => match self.estimator.best() {
                    Some(best) => {
                        tracing::debug!(error = %e, completed = completed, "Ending sync burst early");
                        return Ok(best);
                    }
                    None => return Err(e),
                },
            }
        }

        self.estimator
            .best()
            .ok_or(Error::SynchronizationTimeout(self.config.sync_timeout))
    }

    /// Keep refining the estimate in the background
    pub fn spawn_poller(mut self) -> PollerHandle {
        let clock = Arc::clone(&self.clock);
        let interval = self.config.poll_interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.refine().await {
                    tracing::warn!(error = %e, "Clock refinement failed");
                }
            }
        });

        PollerHandle { clock, task }
    }
}

/// Handle to a background refinement task.
///
/// Dropping the handle stops refinement; the clock keeps its last offset.
pub struct PollerHandle {
    clock: Arc<NetClientClock>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn clock(&self) -> Arc<NetClientClock> {
        Arc::clone(&self.clock)
    }

    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
