//! Network clock provider
//!
//! Answers clock-read requests from receivers with the raw value of the
//! server clock. The clock is read immediately after the request is
//! received and the reply is sent straight away; no smoothing or rate
//! limiting is applied.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

use crate::clock::Clock;
use crate::error::{Result, TransportError};
use crate::protocol::constants::PACKET_SIZE;
use crate::protocol::ClockPacket;
use crate::stats::{ProviderCounters, ProviderStats};

/// Pause after a non-transient receive error
const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Errors a peer can cause on a UDP socket without the socket being broken
fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}

/// UDP clock provider bound to its endpoint
pub struct NetTimeProvider {
    socket: UdpSocket,
    local_addr: SocketAddr,
    clock: Arc<dyn Clock>,
    active: Arc<AtomicBool>,
    counters: Arc<ProviderCounters>,
}

impl NetTimeProvider {
    /// Bind the provider endpoint.
    ///
    /// A bind failure is reported as [`TransportError::Bind`]; callers must
    /// treat it as fatal instead of serving sessions without a shared clock.
    pub async fn bind(addr: SocketAddr, clock: Arc<dyn Clock>) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| TransportError::Bind { addr, source })?;
        let local_addr = socket.local_addr()?;

        tracing::info!(addr = %local_addr, clock = clock.name(), "Clock provider listening");

        Ok(Self {
            socket,
            local_addr,
            clock,
            active: Arc::new(AtomicBool::new(true)),
            counters: Arc::new(ProviderCounters::default()),
        })
    }

    /// Address the provider is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve requests until the socket fails
    pub async fn run(&self) -> Result<()> {
        let mut buf = BytesMut::zeroed(PACKET_SIZE * 4);

        loop {
            let (len, peer) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) if is_transient(&e) => {
                    // ICMP errors from earlier replies surface here on some platforms
                    tracing::trace!(error = %e, "Clock provider transient receive error");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Clock provider receive error");
                    tokio::time::sleep(RECV_ERROR_BACKOFF).await;
                    continue;
                }
            };
            let now = self.clock.now();

            let request = match ClockPacket::decode(&buf[..len]) {
                Ok(packet) => packet,
                Err(e) => {
                    self.counters.record_malformed();
                    tracing::debug!(peer = %peer, error = %e, "Dropping malformed clock request");
                    continue;
                }
            };

            if !self.active.load(Ordering::Acquire) {
                self.counters.record_ignored();
                continue;
            }

            let reply = request.reply(now).encode();
            if let Err(e) = self.socket.send_to(&reply, peer).await {
                tracing::debug!(peer = %peer, error = %e, "Failed to send clock reply");
                continue;
            }

            self.counters.record_served();
            tracing::trace!(peer = %peer, token = request.token, clock = %now, "Clock request served");
        }
    }

    /// Serve requests until `shutdown` resolves
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        tokio::select! {
            _ = shutdown => {
                tracing::info!(addr = %self.local_addr, "Clock provider stopped");
                Ok(())
            }
            result = self.run() => result,
        }
    }

    /// Move the provider onto its own task
    pub fn spawn(self) -> ProviderHandle {
        let local_addr = self.local_addr;
        let active = Arc::clone(&self.active);
        let counters = Arc::clone(&self.counters);

        let task = tokio::spawn(async move {
            if let Err(e) = self.run().await {
                tracing::error!(error = %e, "Clock provider terminated");
            }
        });

        ProviderHandle {
            local_addr,
            active,
            counters,
            task,
        }
    }
}

/// Handle to a running clock provider task.
///
/// Dropping the handle stops the provider.
pub struct ProviderHandle {
    local_addr: SocketAddr,
    active: Arc<AtomicBool>,
    counters: Arc<ProviderCounters>,
    task: JoinHandle<()>,
}

impl ProviderHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Enable or disable answering requests
    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
        tracing::info!(addr = %self.local_addr, active = active, "Clock provider activity changed");
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> ProviderStats {
        self.counters.snapshot()
    }

    pub(crate) fn counters(&self) -> &Arc<ProviderCounters> {
        &self.counters
    }

    /// Stop serving requests
    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for ProviderHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
