//! # redis-driver-pool
//!
//! Bounded connection pool for Redis-compatible stores, plus the [`Cache`]
//! command facade built on top of it.
//!
//! The pool owns a set of live connections, tracks idle versus in-use, and
//! arbitrates checkout under concurrent demand:
//!
//! - At most `max_active` connections are checked out at any instant; the
//!   ceiling is enforced by a semaphore, so no interleaving of concurrent
//!   callers can oversubscribe it.
//! - When the ceiling is reached, callers either wait (FIFO, bounded by
//!   `acquire_timeout`) or fail immediately with
//!   [`PoolError::Exhausted`], depending on `wait_on_exhaustion`.
//! - Idle connections past `idle_timeout` are discarded at checkout, never
//!   handed out. Connections released in a broken state are closed, never
//!   pooled.
//! - A checked-out connection is exclusively owned by its caller; the guard
//!   returns it on drop, exactly once, on every exit path.
//!
//! ## Example
//!
//! ```rust,ignore
//! use redis_driver_client::Config;
//! use redis_driver_pool::{Cache, Pool, PoolConfig};
//!
//! let pool = Pool::new(PoolConfig::new().max_active(16), Config::default())?;
//! let cache = Cache::new(pool);
//!
//! cache.set("greeting", b"hello").await?;
//! assert_eq!(cache.get("greeting").await?.as_deref(), Some(&b"hello"[..]));
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod cache;
pub mod config;
pub mod error;
pub mod pool;

pub use cache::{Cache, CacheError};
pub use config::PoolConfig;
pub use error::PoolError;
pub use pool::{Pool, PoolStatus, PooledConnection};
