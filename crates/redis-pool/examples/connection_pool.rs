//! Connection pooling example.
//!
//! Demonstrates the pool under concurrent load and how to monitor it
//! through `Pool::status()`.
//!
//! # Running
//!
//! ```bash
//! export REDIS_HOST=localhost
//! export REDIS_PASSWORD=secret   # optional
//!
//! cargo run --example connection_pool
//! ```

// Allow common patterns in example code
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use redis_driver_client::Config;
use redis_driver_pool::{Cache, CacheError, Pool, PoolConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let host = std::env::var("REDIS_HOST").unwrap_or_else(|_| "localhost".into());
    let mut config = Config::new().host(host);
    if let Ok(password) = std::env::var("REDIS_PASSWORD") {
        config = config.password(password);
    }

    println!("=== Connection Pool Example ===\n");

    let pool_config = PoolConfig::new()
        .max_active(10)
        .max_idle(5)
        .idle_timeout(Duration::from_secs(300));

    println!("Pool configuration:");
    println!("  Max active: {}", pool_config.max_active);
    println!("  Max idle: {}", pool_config.max_idle);
    println!("  Idle timeout: {:?}", pool_config.idle_timeout);
    println!();

    let cache = Cache::new(Pool::new(pool_config, config)?);

    // Example 1: Basic usage
    println!("1. Basic usage:");
    cache.set("example:greeting", b"hello").await?;
    let value = cache.get("example:greeting").await?;
    println!("  example:greeting = {:?}", value.map(|v| String::from_utf8_lossy(&v).into_owned()));
    print_pool_status(&cache);

    // Example 2: Concurrent usage
    println!("\n2. Concurrent usage (20 parallel operations):");
    let start = Instant::now();
    let shared = Arc::new(cache);
    let mut handles = vec![];

    for i in 0..20 {
        let cache = Arc::clone(&shared);
        handles.push(tokio::spawn(async move {
            let key = format!("example:counter:{}", i % 4);
            cache.incr(&key).await?;
            Ok::<_, CacheError>(())
        }));
    }

    let mut completed = 0;
    for handle in handles {
        if handle.await?.is_ok() {
            completed += 1;
        }
    }
    println!("  Completed {} operations in {:?}", completed, start.elapsed());
    print_pool_status(&shared);

    // Example 3: Hash and set structures
    println!("\n3. Hash and set structures:");
    shared
        .hmset("example:user:1", &[("name", &b"alice"[..]), ("role", &b"admin"[..])])
        .await?;
    let fields = shared
        .hmget("example:user:1", &["name", "role", "email"])
        .await?;
    println!("  user fields (email unset): {:?}", fields);

    // Clean up the example keys.
    shared
        .del(&[
            "example:greeting",
            "example:counter:0",
            "example:counter:1",
            "example:counter:2",
            "example:counter:3",
            "example:user:1",
        ])
        .await?;

    // Graceful shutdown
    println!("\n4. Graceful shutdown:");
    shared.close().await;
    println!("  Pool closed.");

    Ok(())
}

fn print_pool_status(cache: &Cache) {
    let status = cache.pool().status();
    println!(
        "  Status: {} in use, {} idle ({:.1}% utilization)",
        status.in_use,
        status.available,
        status.utilization()
    );
}
