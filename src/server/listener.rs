//! Network clock server
//!
//! Owns the distributed clock, publishes it through the clock provider and
//! builds one synchronized pipeline per accepted receiver session.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;

use crate::clock::{Clock, SystemClock};
use crate::error::{ConfigurationError, Result};
use crate::server::config::ServerConfig;
use crate::server::mounts::MountPoints;
use crate::server::provider::{NetTimeProvider, ProviderHandle};
use crate::session::lifecycle::SessionGuard;
use crate::session::{Session, SessionContext, SessionPipelineBinder};
use crate::stats::{ServerStats, SessionCounters};

/// Clock distribution server
pub struct NetClockServer {
    config: ServerConfig,
    clock: Arc<dyn Clock>,
    provider: ProviderHandle,
    mounts: Arc<MountPoints>,
    binder: SessionPipelineBinder,
    next_session_id: AtomicU64,
    session_semaphore: Option<Arc<Semaphore>>,
    sessions: Arc<SessionCounters>,
    started_at: Instant,
}

impl NetClockServer {
    /// Start a server distributing a fresh system clock
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock::with_name("server"))).await
    }

    /// Start a server distributing `clock`.
    ///
    /// Fails if the clock endpoint cannot be bound; no session is ever served
    /// without the provider running.
    pub async fn with_clock(config: ServerConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let provider = NetTimeProvider::bind(config.clock_addr, Arc::clone(&clock)).await?;
        let provider = provider.spawn();

        let session_semaphore = if config.max_sessions > 0 {
            Some(Arc::new(Semaphore::new(config.max_sessions)))
        } else {
            None
        };

        tracing::info!(
            clock_addr = %provider.local_addr(),
            rtsp_addr = %config.rtsp_addr,
            origin = ?config.origin,
            "Clock server started"
        );

        Ok(Self {
            binder: SessionPipelineBinder::new(config.origin),
            config,
            clock,
            provider,
            mounts: Arc::new(MountPoints::new()),
            next_session_id: AtomicU64::new(1),
            session_semaphore,
            sessions: Arc::new(SessionCounters::default()),
            started_at: Instant::now(),
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get a reference to the mount points
    pub fn mounts(&self) -> &Arc<MountPoints> {
        &self.mounts
    }

    /// The distributed clock
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Address the clock provider is bound to
    pub fn clock_addr(&self) -> SocketAddr {
        self.provider.local_addr()
    }

    pub fn provider(&self) -> &ProviderHandle {
        &self.provider
    }

    pub fn stats(&self) -> ServerStats {
        ServerStats::collect(&self.sessions, self.provider.counters(), self.started_at)
    }

    /// RTSP URL of a mount point
    pub fn stream_url(&self, mount: &str) -> String {
        let mount = mount.trim_start_matches('/');
        let addr = self.config.rtsp_addr;
        if addr.ip().is_unspecified() {
            format!("rtsp://127.0.0.1:{}/{}", addr.port(), mount)
        } else {
            format!("rtsp://{}/{}", addr, mount)
        }
    }

    /// Build a session for a receiver requesting `mount`.
    ///
    /// The pipeline is created by the mount's factory, bound to the
    /// distributed clock and has its RTP sync configured, in that order.
    /// Any failure affects this session only.
    pub async fn accept_session(&self, mount: &str, peer_addr: SocketAddr) -> Result<Session> {
        let result = self.build_session(mount, peer_addr).await;
        if let Err(e) = &result {
            self.sessions.record_failed();
            tracing::warn!(mount = %mount, peer = %peer_addr, error = %e, "Session rejected");
        }
        result
    }

    async fn build_session(&self, mount: &str, peer_addr: SocketAddr) -> Result<Session> {
        // Check session limit
        let permit = match &self.session_semaphore {
            Some(sem) => match Arc::clone(sem).try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => return Err(ConfigurationError::SessionLimit(self.config.max_sessions).into()),
            },
            None => None,
        };

        let factory = self
            .mounts
            .get(mount)
            .await
            .ok_or_else(|| ConfigurationError::UnknownMount(mount.to_string()))?;

        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        let ctx = SessionContext::new(session_id, peer_addr, mount);

        tracing::debug!(session_id = session_id, peer = %peer_addr, mount = %mount, "New session");

        let pipeline = factory.create_pipeline(&ctx)?;
        let mut session = Session::new(ctx.clone(), pipeline);

        session.bind_clock_or_local(
            &self.binder,
            Arc::clone(&self.clock),
            self.config.fallback_to_local_clock,
        )?;
        session.apply_sync_override(|pipeline| factory.setup_rtp_sync(&ctx, pipeline))?;

        session.attach_guard(SessionGuard::new(Arc::clone(&self.sessions), permit));

        tracing::info!(
            session_id = session_id,
            url = %self.stream_url(mount),
            state = %session.state(),
            "Session synchronized"
        );
        Ok(session)
    }

    /// Serve until `shutdown` resolves, then stop the clock provider
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        shutdown.await;
        tracing::info!("Shutdown signal received");
        self.provider.shutdown();
        Ok(())
    }
}

impl Drop for NetClockServer {
    fn drop(&mut self) {
        tracing::debug!(clock_addr = %self.provider.local_addr(), "Clock server stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ClockTime;
    use crate::error::Error;
    use crate::pipeline::PipelineDescription;
    use crate::session::{LaunchFactory, PipelineFactory, SyncState};
    use tokio_test::{assert_err, assert_ok};

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    fn test_config() -> ServerConfig {
        ServerConfig::default().clock_addr("127.0.0.1:0".parse().unwrap())
    }

    fn factory(description: PipelineDescription) -> Arc<dyn PipelineFactory> {
        Arc::new(LaunchFactory::new(description))
    }

    #[tokio::test]
    async fn test_sessions_share_running_time() {
        let server = NetClockServer::bind(test_config()).await.unwrap();
        server
            .mounts()
            .add_factory("/test", factory(PipelineDescription::new("test")))
            .await;

        let a = server.accept_session("/test", peer()).await.unwrap();
        let b = server.accept_session("/test", peer()).await.unwrap();

        assert_ne!(a.id(), b.id());
        assert_eq!(a.state(), SyncState::Synchronized);
        assert_eq!(b.state(), SyncState::Synchronized);

        let at = ClockTime::from_millis(750);
        assert_eq!(a.running_time_at(at), b.running_time_at(at));
        assert_eq!(a.running_time_at(at), at);

        let stats = server.stats();
        assert_eq!(stats.sessions_accepted, 2);
        assert_eq!(stats.active_sessions, 2);

        drop(a);
        assert_eq!(server.stats().active_sessions, 1);
    }

    #[tokio::test]
    async fn test_missing_rtp_sync_fails_only_that_mount() {
        let server = NetClockServer::bind(test_config()).await.unwrap();
        server
            .mounts()
            .add_factory(
                "/broken",
                factory(PipelineDescription::new("broken").without_rtp_session()),
            )
            .await;
        server
            .mounts()
            .add_factory("/test", factory(PipelineDescription::new("test")))
            .await;

        let err = assert_err!(server.accept_session("/broken", peer()).await);
        assert!(matches!(
            err,
            Error::Config(ConfigurationError::MissingRtpSync(_))
        ));

        let session = assert_ok!(server.accept_session("/test", peer()).await);
        assert!(session.can_output());

        let stats = server.stats();
        assert_eq!(stats.sessions_failed, 1);
        assert_eq!(stats.sessions_accepted, 1);
    }

    #[tokio::test]
    async fn test_unknown_mount() {
        let server = NetClockServer::bind(test_config()).await.unwrap();

        let err = assert_err!(server.accept_session("/missing", peer()).await);
        assert!(matches!(
            err,
            Error::Config(ConfigurationError::UnknownMount(path)) if path == "/missing"
        ));
    }

    #[tokio::test]
    async fn test_session_limit() {
        let server = NetClockServer::bind(test_config().max_sessions(1))
            .await
            .unwrap();
        server
            .mounts()
            .add_factory("/test", factory(PipelineDescription::new("test")))
            .await;

        let first = assert_ok!(server.accept_session("/test", peer()).await);
        let err = assert_err!(server.accept_session("/test", peer()).await);
        assert!(matches!(
            err,
            Error::Config(ConfigurationError::SessionLimit(1))
        ));

        drop(first);
        assert_ok!(server.accept_session("/test", peer()).await);
    }

    #[tokio::test]
    async fn test_clock_bind_conflict_is_fatal() {
        let first = NetClockServer::bind(test_config()).await.unwrap();
        let config = test_config().clock_addr(first.clock_addr());

        let err = match NetClockServer::bind(config).await {
            Ok(_) => panic!("second bind on the clock address succeeded"),
            Err(e) => e,
        };
        assert!(err.is_transport());
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_stream_url() {
        let config = test_config().rtsp_addr("0.0.0.0:8554".parse().unwrap());
        let server = NetClockServer::bind(config).await.unwrap();

        assert_eq!(server.stream_url("/test"), "rtsp://127.0.0.1:8554/test");
        assert_ne!(server.clock_addr().port(), 8554);
    }

    #[tokio::test]
    async fn test_run_until_stops_provider() {
        let server = NetClockServer::bind(test_config()).await.unwrap();
        assert_ok!(server.run_until(async {}).await);
    }
}
