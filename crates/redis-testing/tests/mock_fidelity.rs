//! Wire-level fidelity checks for the mock server, driven with raw RESP
//! bytes rather than the driver, so driver bugs cannot mask server bugs.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use bytes::BytesMut;
use redis_driver_testing::MockRedisServer;
use resp_protocol::{Command, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

async fn exchange(stream: &mut TcpStream, cmd: Command) -> Value {
    let mut out = BytesMut::new();
    cmd.encode(&mut out);
    stream.write_all(&out).await.unwrap();

    let mut buf = BytesMut::with_capacity(1024);
    loop {
        if let Some(value) = Value::decode(&mut buf).unwrap() {
            return value;
        }
        let read = stream.read_buf(&mut buf).await.unwrap();
        assert!(read > 0, "server closed mid-reply");
    }
}

#[tokio::test]
async fn answers_ping_with_pong() {
    let server = MockRedisServer::start().await.unwrap();
    let mut stream = TcpStream::connect(server.addr()).await.unwrap();

    let reply = exchange(&mut stream, Command::new("PING")).await;
    assert_eq!(reply, Value::Simple("PONG".into()));
}

#[tokio::test]
async fn set_get_del_lifecycle() {
    let server = MockRedisServer::start().await.unwrap();
    let mut stream = TcpStream::connect(server.addr()).await.unwrap();

    let reply = exchange(&mut stream, Command::new("SET").arg("k").arg("v")).await;
    assert_eq!(reply, Value::Simple("OK".into()));

    let reply = exchange(&mut stream, Command::new("GET").arg("k")).await;
    assert_eq!(reply, Value::Bulk("v".into()));

    let reply = exchange(&mut stream, Command::new("DEL").arg("k")).await;
    assert_eq!(reply, Value::Integer(1));

    let reply = exchange(&mut stream, Command::new("GET").arg("k")).await;
    assert_eq!(reply, Value::Nil);
}

#[tokio::test]
async fn enforces_auth_before_other_commands() {
    let server = MockRedisServer::builder()
        .password("sesame")
        .start()
        .await
        .unwrap();
    let mut stream = TcpStream::connect(server.addr()).await.unwrap();

    let reply = exchange(&mut stream, Command::new("PING")).await;
    assert!(matches!(reply, Value::Error(ref m) if m.starts_with("NOAUTH")));

    let reply = exchange(&mut stream, Command::new("AUTH").arg("wrong")).await;
    assert!(matches!(reply, Value::Error(_)));

    let reply = exchange(&mut stream, Command::new("AUTH").arg("sesame")).await;
    assert_eq!(reply, Value::Simple("OK".into()));

    let reply = exchange(&mut stream, Command::new("PING")).await;
    assert_eq!(reply, Value::Simple("PONG".into()));
}

#[tokio::test]
async fn select_validates_the_database_index() {
    let server = MockRedisServer::builder().databases(4).start().await.unwrap();
    let mut stream = TcpStream::connect(server.addr()).await.unwrap();

    let reply = exchange(&mut stream, Command::new("SELECT").arg_int(3)).await;
    assert_eq!(reply, Value::Simple("OK".into()));

    let reply = exchange(&mut stream, Command::new("SELECT").arg_int(4)).await;
    assert!(matches!(reply, Value::Error(_)));
}

#[tokio::test]
async fn unknown_commands_get_an_error_reply() {
    let server = MockRedisServer::start().await.unwrap();
    let mut stream = TcpStream::connect(server.addr()).await.unwrap();

    let reply = exchange(&mut stream, Command::new("FLY")).await;
    assert!(matches!(reply, Value::Error(ref m) if m.contains("unknown command")));
}

#[tokio::test]
async fn pipelined_requests_are_answered_in_order() {
    let server = MockRedisServer::start().await.unwrap();
    let mut stream = TcpStream::connect(server.addr()).await.unwrap();

    let mut out = BytesMut::new();
    Command::new("SET").arg("n").arg("1").encode(&mut out);
    Command::new("INCR").arg("n").encode(&mut out);
    Command::new("INCR").arg("n").encode(&mut out);
    stream.write_all(&out).await.unwrap();

    let mut buf = BytesMut::with_capacity(1024);
    let mut replies = Vec::new();
    while replies.len() < 3 {
        if let Some(value) = Value::decode(&mut buf).unwrap() {
            replies.push(value);
            continue;
        }
        let read = stream.read_buf(&mut buf).await.unwrap();
        assert!(read > 0, "server closed mid-reply");
    }

    assert_eq!(
        replies,
        vec![
            Value::Simple("OK".into()),
            Value::Integer(2),
            Value::Integer(3),
        ]
    );
}
