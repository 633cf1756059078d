//! Receiver-side session setup
//!
//! A receiver synchronizes its [`NetClientClock`] against the server, then
//! binds each local playback session to it and routes RTP sync through the
//! pipeline clock, the same way the server configures its sessions.

use std::sync::Arc;

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::session::{OriginPolicy, Session, SessionPipelineBinder, SyncOverridePolicy};

use super::config::ClientConfig;
use super::estimator::ClockOffsetEstimate;
use super::net_clock::{ClockClient, NetClientClock, PollerHandle};

/// Network clock receiver
pub struct Receiver {
    client: ClockClient,
    binder: SessionPipelineBinder,
}

impl Receiver {
    /// Connect to a clock provider. No exchange happens yet.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        Ok(Self {
            client: ClockClient::connect(config).await?,
            binder: SessionPipelineBinder::default(),
        })
    }

    /// Use a different running-time origin for attached sessions
    pub fn with_origin(mut self, origin: OriginPolicy) -> Self {
        self.binder = SessionPipelineBinder::new(origin);
        self
    }

    pub fn clock(&self) -> Arc<NetClientClock> {
        self.client.clock()
    }

    pub fn estimate(&self) -> Option<ClockOffsetEstimate> {
        self.client.estimate()
    }

    /// Run the initial synchronization if it has not succeeded yet
    pub async fn synchronize(&mut self) -> Result<()> {
        if self.client.clock().is_synced() {
            return Ok(());
        }
        self.client.synchronize().await.map(|_| ())
    }

    /// Bind `session` to the network clock and enable pipeline-clock sync.
    ///
    /// With local fallback disabled, a synchronization failure is handled in
    /// one of two ways:
    ///
    /// - [`Error::SynchronizationTimeout`]: the session stays unbound and
    ///   produces no output; the caller may retry
    /// - any other error (unreachable provider, exhausted retries): the
    ///   session fails
    ///
    /// With fallback enabled the session plays from a local clock instead.
    pub async fn attach(&mut self, session: &mut Session) -> Result<()> {
        let fallback = self.client.config().fallback_to_local_clock;

        if let Err(e) = self.synchronize().await {
            if !fallback {
                if let Error::SynchronizationTimeout(_) = e {
                    tracing::warn!(session_id = session.id(), error = %e, "Receiver not synchronized");
                    return Err(e);
                }
                return Err(session.fail(e));
            }
        }

        let clock: Arc<dyn Clock> = self.client.clock();
        session.bind_clock_or_local(&self.binder, clock, fallback)?;
        session.apply_sync_override(|pipeline| SyncOverridePolicy.apply(pipeline))?;

        tracing::info!(
            session_id = session.id(),
            local_fallback = session.is_local_fallback(),
            "Receiver session attached"
        );
        Ok(())
    }

    /// Hand the clock over to background refinement
    pub fn spawn_poller(self) -> PollerHandle {
        self.client.spawn_poller()
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use super::*;
    use crate::clock::SystemClock;
    use crate::pipeline::PipelineDescription;
    use crate::server::NetTimeProvider;
    use crate::session::{SessionContext, SyncState};

    fn session(id: u64) -> Session {
        let ctx = SessionContext::new(id, "127.0.0.1:5000".parse().unwrap(), "/test");
        Session::new(ctx, Box::new(PipelineDescription::new("playback").build()))
    }

    fn dead_addr() -> SocketAddr {
        let socket = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        socket.local_addr().unwrap()
    }

    fn fast_config(addr: SocketAddr) -> ClientConfig {
        ClientConfig::new(addr)
            .request_timeout(Duration::from_millis(50))
            .retry_backoff(Duration::from_millis(5))
            .max_attempts(2)
            .sync_timeout(Duration::from_millis(500))
    }

    #[tokio::test]
    async fn test_attach_synchronizes_session() {
        let provider = NetTimeProvider::bind(
            "127.0.0.1:0".parse().unwrap(),
            Arc::new(SystemClock::new()) as Arc<dyn Clock>,
        )
        .await
        .unwrap()
        .spawn();

        let mut receiver = Receiver::connect(fast_config(provider.local_addr()))
            .await
            .unwrap();
        let mut session = session(1);

        receiver.attach(&mut session).await.unwrap();

        assert_eq!(session.state(), SyncState::Synchronized);
        assert!(!session.is_local_fallback());
        assert!(session.binding().unwrap().clock_name.starts_with("net-client"));
    }

    #[tokio::test]
    async fn test_unreachable_provider_fails_session() {
        let mut receiver = Receiver::connect(fast_config(dead_addr())).await.unwrap();
        let mut session = session(1);

        let err = receiver.attach(&mut session).await.unwrap_err();

        assert!(err.is_transport());
        assert_eq!(session.state(), SyncState::Failed);
        assert!(session.pipeline().is_none());
        assert!(!session.can_output());
    }

    #[tokio::test]
    async fn test_sync_timeout_leaves_session_unbound() {
        // Bound but never answers
        let silent = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let config = fast_config(silent.local_addr().unwrap())
            .request_timeout(Duration::from_millis(200))
            .sync_timeout(Duration::from_millis(100));
        let mut receiver = Receiver::connect(config).await.unwrap();
        let mut session = session(1);

        let err = receiver.attach(&mut session).await.unwrap_err();

        assert!(matches!(err, Error::SynchronizationTimeout(_)));
        assert_eq!(session.state(), SyncState::Unbound);
        assert!(session.pipeline().is_some());
        assert!(!session.can_output());
    }

    #[tokio::test]
    async fn test_sync_failure_with_fallback_plays_locally() {
        let config = fast_config(dead_addr()).fallback_to_local_clock(true);
        let mut receiver = Receiver::connect(config).await.unwrap();
        let mut session = session(1);

        receiver.attach(&mut session).await.unwrap();

        assert_eq!(session.state(), SyncState::Synchronized);
        assert!(session.is_local_fallback());
        assert_eq!(session.binding().unwrap().clock_name, "local-fallback");
    }
}
