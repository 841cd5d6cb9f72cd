//! Basic single-connection usage.
//!
//! # Running
//!
//! ```bash
//! export REDIS_HOST=localhost
//!
//! cargo run --example basic
//! ```

// Allow common patterns in example code
#![allow(clippy::unwrap_used, clippy::expect_used)]

use redis_driver_client::{Config, Connection};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let host = std::env::var("REDIS_HOST").unwrap_or_else(|_| "localhost".into());
    let config = Config::new().host(host);

    let mut conn = Connection::connect(&config).await?;
    println!("connected (connection id {})", conn.id());

    conn.set("example:message", b"hello from redis-driver-client").await?;
    match conn.get("example:message").await? {
        Some(value) => println!("example:message = {}", String::from_utf8_lossy(&value)),
        None => println!("example:message is not set"),
    }

    let hits = conn.incr("example:hits").await?;
    println!("example:hits = {hits}");

    conn.del(&["example:message", "example:hits"]).await?;
    Ok(())
}
