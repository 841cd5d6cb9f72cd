//! Connection handshake and exchange tests against the in-process mock
//! server. No external store is required.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use redis_driver_client::{Command, Config, Connection, Error, TimeoutConfig};
use redis_driver_testing::MockRedisServer;

fn config_for(server: &MockRedisServer) -> Config {
    Config::new()
        .host(server.addr().ip().to_string())
        .port(server.addr().port())
}

#[tokio::test]
async fn connect_set_get_roundtrip() {
    let server = MockRedisServer::start().await.unwrap();
    let mut conn = Connection::connect(&config_for(&server)).await.unwrap();

    conn.set("greeting", b"hello").await.unwrap();
    assert_eq!(
        conn.get("greeting").await.unwrap().as_deref(),
        Some(&b"hello"[..])
    );
    assert!(conn.is_healthy());
}

#[tokio::test]
async fn get_on_absent_key_is_none_not_error() {
    let server = MockRedisServer::start().await.unwrap();
    let mut conn = Connection::connect(&config_for(&server)).await.unwrap();

    assert_eq!(conn.get("never-set").await.unwrap(), None);
    assert!(conn.is_healthy());
}

#[tokio::test]
async fn binary_values_survive_roundtrip() {
    let server = MockRedisServer::start().await.unwrap();
    let mut conn = Connection::connect(&config_for(&server)).await.unwrap();

    let payload = [0u8, 13, 10, 255, 127];
    conn.set("blob", &payload).await.unwrap();
    assert_eq!(conn.get("blob").await.unwrap().as_deref(), Some(&payload[..]));
}

#[tokio::test]
async fn authenticates_when_credential_configured() {
    let server = MockRedisServer::builder()
        .password("sesame")
        .start()
        .await
        .unwrap();
    let config = config_for(&server).password("sesame");

    let mut conn = Connection::connect(&config).await.unwrap();
    conn.ping().await.unwrap();
}

#[tokio::test]
async fn auth_rejection_aborts_creation() {
    let server = MockRedisServer::builder()
        .password("sesame")
        .start()
        .await
        .unwrap();
    let config = config_for(&server).password("wrong");

    let err = Connection::connect(&config).await.unwrap_err();
    assert!(matches!(err, Error::Auth(_)), "got {err:?}");
    assert!(err.is_connect_error());
}

#[tokio::test]
async fn unauthenticated_commands_fail_against_protected_server() {
    let server = MockRedisServer::builder()
        .password("sesame")
        .start()
        .await
        .unwrap();
    // No credential configured, so the handshake skips AUTH entirely.
    let mut conn = Connection::connect(&config_for(&server)).await.unwrap();

    let err = conn.set("k", b"v").await.unwrap_err();
    assert!(matches!(err, Error::Protocol(_)), "got {err:?}");
    assert!(!conn.is_healthy());
}

#[tokio::test]
async fn selects_configured_database() {
    let server = MockRedisServer::start().await.unwrap();
    let config = config_for(&server).database(3);

    let mut conn = Connection::connect(&config).await.unwrap();
    conn.ping().await.unwrap();
}

#[tokio::test]
async fn database_selection_failure_aborts_creation() {
    let server = MockRedisServer::builder()
        .databases(4)
        .start()
        .await
        .unwrap();
    let config = config_for(&server).database(10);

    let err = Connection::connect(&config).await.unwrap_err();
    assert!(matches!(err, Error::Connect(_)), "got {err:?}");
    assert!(err.is_connect_error());
}

#[tokio::test]
async fn refused_transport_is_a_connect_error() {
    // Bind and immediately drop a listener to get a port nothing serves.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = Config::new()
        .host(addr.ip().to_string())
        .port(addr.port())
        .timeouts(TimeoutConfig::new().connect_timeout(Duration::from_secs(1)));

    let err = Connection::connect(&config).await.unwrap_err();
    assert!(matches!(err, Error::Connect(_)), "got {err:?}");
}

#[tokio::test]
async fn stalled_reply_times_out_and_poisons() {
    let server = MockRedisServer::start().await.unwrap();
    let config = config_for(&server)
        .timeouts(TimeoutConfig::new().command_timeout(Duration::from_millis(100)));
    let mut conn = Connection::connect(&config).await.unwrap();

    let cmd = Command::new("DEBUG").arg("SLEEP").arg("1");
    let err = conn.command(&cmd).await.unwrap_err();
    assert!(matches!(err, Error::Timeout), "got {err:?}");
    assert!(!conn.is_healthy());
}

#[tokio::test]
async fn incr_on_non_numeric_value_is_a_protocol_error() {
    let server = MockRedisServer::builder()
        .seed_string("note", b"not a number")
        .start()
        .await
        .unwrap();
    let mut conn = Connection::connect(&config_for(&server)).await.unwrap();

    let err = conn.incr("note").await.unwrap_err();
    assert!(matches!(err, Error::Protocol(_)), "got {err:?}");
    assert!(!conn.is_healthy());
}

#[tokio::test]
async fn severed_connection_poisons_on_next_exchange() {
    let server = MockRedisServer::start().await.unwrap();
    let mut conn = Connection::connect(&config_for(&server)).await.unwrap();
    conn.ping().await.unwrap();

    server.kill_connections();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let err = conn.ping().await.unwrap_err();
    assert!(
        matches!(err, Error::ConnectionClosed | Error::Io(_)),
        "got {err:?}"
    );
    assert!(!conn.is_healthy());
}

#[tokio::test]
async fn connection_ids_are_unique() {
    let server = MockRedisServer::start().await.unwrap();
    let config = config_for(&server);

    let a = Connection::connect(&config).await.unwrap();
    let b = Connection::connect(&config).await.unwrap();
    assert_ne!(a.id(), b.id());
}
