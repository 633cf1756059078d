//! Server and receivers over loopback UDP

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use netclock_rs::client::ClientConfig;
use netclock_rs::error::{ConfigurationError, Error};
use netclock_rs::pipeline::PipelineDescription;
use netclock_rs::session::{LaunchFactory, Session, SessionContext, SyncState};
use netclock_rs::{Clock, ClockTime, NetClockServer, Receiver, ServerConfig};
use tokio_test::{assert_err, assert_ok};

async fn start_server() -> NetClockServer {
    let config = ServerConfig::default().clock_addr("127.0.0.1:0".parse().unwrap());
    let server = NetClockServer::bind(config).await.unwrap();
    server
        .mounts()
        .add_factory(
            "/test",
            Arc::new(LaunchFactory::new(PipelineDescription::new("test"))),
        )
        .await;
    server
}

fn client_config(addr: SocketAddr) -> ClientConfig {
    ClientConfig::new(addr)
        .request_timeout(Duration::from_millis(100))
        .retry_backoff(Duration::from_millis(5))
        .max_attempts(2)
        .sync_timeout(Duration::from_secs(2))
}

fn playback_session(id: u64) -> Session {
    let ctx = SessionContext::new(id, "127.0.0.1:8554".parse().unwrap(), "/test");
    Session::new(ctx, Box::new(PipelineDescription::new("playback").build()))
}

#[tokio::test]
async fn test_receivers_agree_on_running_time() {
    let server = start_server().await;
    let served = assert_ok!(server.accept_session("/test", "127.0.0.1:40000".parse().unwrap()).await);

    let mut receiver_a = Receiver::connect(client_config(server.clock_addr()))
        .await
        .unwrap();
    let mut receiver_b = Receiver::connect(client_config(server.clock_addr()))
        .await
        .unwrap();
    let mut session_a = playback_session(1);
    let mut session_b = playback_session(2);

    assert_ok!(receiver_a.attach(&mut session_a).await);
    assert_ok!(receiver_b.attach(&mut session_b).await);

    assert_eq!(session_a.state(), SyncState::Synchronized);
    assert_eq!(session_b.state(), SyncState::Synchronized);

    // Each receiver keeps its own estimate
    assert!(receiver_a.estimate().is_some());
    assert!(receiver_b.estimate().is_some());
    assert!(!Arc::ptr_eq(&receiver_a.clock(), &receiver_b.clock()));

    let at = ClockTime::from_millis(500);
    assert_eq!(session_a.running_time_at(at), session_b.running_time_at(at));
    assert_eq!(session_a.running_time_at(at), served.running_time_at(at));

    // Estimated server time stays close to the real one on loopback
    let estimated = receiver_a.clock().now();
    let actual = server.clock().now();
    assert!(estimated.signed_diff(actual).unsigned_abs() < Duration::from_millis(50).as_nanos() as u64);

    assert!(server.provider().stats().requests_served >= 6);
}

#[tokio::test]
async fn test_rtp_follows_pipeline_clock() {
    let server = start_server().await;
    let mut receiver = Receiver::connect(client_config(server.clock_addr()))
        .await
        .unwrap();
    let mut session = playback_session(1);
    assert_ok!(receiver.attach(&mut session).await);

    let sender_report = ClockTime::from_secs(1_000_000);
    let used = assert_ok!(session.process_rtp(Some(sender_report)));

    assert_ne!(used, sender_report);
    assert!(used <= session.running_time());
}

#[tokio::test]
async fn test_no_reply_leaves_session_unbound() {
    // Bound but never answers
    let silent = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    let config = client_config(silent.local_addr().unwrap())
        .request_timeout(Duration::from_millis(200))
        .sync_timeout(Duration::from_millis(100));
    let mut receiver = Receiver::connect(config).await.unwrap();
    let mut session = playback_session(1);

    let err = assert_err!(receiver.attach(&mut session).await);
    assert!(matches!(err, Error::SynchronizationTimeout(_)));

    assert_eq!(session.state(), SyncState::Unbound);
    assert!(!session.can_output());
    assert!(session.running_time().is_none());
    let err = assert_err!(session.process_rtp(None));
    assert!(matches!(
        err,
        Error::Config(ConfigurationError::SessionNotSynchronized)
    ));
}

#[tokio::test]
async fn test_retry_after_provider_reactivated() {
    let server = start_server().await;
    server.provider().set_active(false);

    let config = client_config(server.clock_addr())
        .request_timeout(Duration::from_millis(200))
        .sync_timeout(Duration::from_millis(100));
    let mut receiver = Receiver::connect(config).await.unwrap();
    let mut session = playback_session(1);

    let err = assert_err!(receiver.attach(&mut session).await);
    assert!(matches!(err, Error::SynchronizationTimeout(_)));
    assert_eq!(session.state(), SyncState::Unbound);
    assert!(server.provider().stats().ignored_inactive > 0);

    server.provider().set_active(true);
    let mut receiver = Receiver::connect(client_config(server.clock_addr()))
        .await
        .unwrap();
    assert_ok!(receiver.attach(&mut session).await);
    assert_eq!(session.state(), SyncState::Synchronized);
}

#[tokio::test]
async fn test_unreachable_server_fails_session() {
    let addr = {
        let socket = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        socket.local_addr().unwrap()
    };
    let mut receiver = Receiver::connect(client_config(addr)).await.unwrap();
    let mut session = playback_session(1);

    let err = assert_err!(receiver.attach(&mut session).await);
    assert!(err.is_transport());
    assert_eq!(session.state(), SyncState::Failed);
    assert!(session.pipeline().is_none());
}

#[tokio::test]
async fn test_broken_mount_does_not_affect_others() {
    let server = start_server().await;
    server
        .mounts()
        .add_factory(
            "/no-rtp",
            Arc::new(LaunchFactory::new(
                PipelineDescription::new("no-rtp").without_rtp_session(),
            )),
        )
        .await;
    let peer: SocketAddr = "127.0.0.1:40000".parse().unwrap();

    let err = assert_err!(server.accept_session("/no-rtp", peer).await);
    assert!(err.is_configuration());

    let session = assert_ok!(server.accept_session("/test", peer).await);
    assert_eq!(session.state(), SyncState::Synchronized);
    assert_eq!(server.stats().sessions_failed, 1);
}
