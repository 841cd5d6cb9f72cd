//! Connection pool implementation.

use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use redis_driver_client::{Config, Connection};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tokio::time::timeout;

use crate::config::PoolConfig;
use crate::error::PoolError;

/// A connection pool for a Redis-compatible store.
///
/// The pool hands out [`PooledConnection`] guards. A guard owns its
/// connection exclusively until dropped; the drop returns the connection to
/// the pool, where it is either parked for reuse or closed, depending on its
/// health and the idle-queue capacity.
///
/// Capacity is enforced with a semaphore holding `max_active` permits. Every
/// checkout holds one permit for its whole lifetime, so the ceiling cannot
/// be oversubscribed by any interleaving of concurrent callers, and a caller
/// that abandons the wait (timeout or future cancellation) leaves no trace
/// in the accounting. Waiters are woken in FIFO order.
pub struct Pool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    config: PoolConfig,
    client_config: Config,
    semaphore: Arc<Semaphore>,
    state: Mutex<PoolState>,
}

struct PoolState {
    idle: VecDeque<Idle>,
    closed: bool,
}

struct Idle {
    conn: Connection,
    parked_at: Instant,
}

impl Idle {
    fn expired(&self, idle_timeout: std::time::Duration) -> bool {
        self.parked_at.elapsed() > idle_timeout
    }
}

impl Pool {
    /// Create a pool. No connections are opened until first demand.
    pub fn new(config: PoolConfig, client_config: Config) -> Result<Self, PoolError> {
        config.validate()?;
        let max_active = config.max_active as usize;
        Ok(Self {
            inner: Arc::new(PoolInner {
                config,
                client_config,
                semaphore: Arc::new(Semaphore::new(max_active)),
                state: Mutex::new(PoolState {
                    idle: VecDeque::new(),
                    closed: false,
                }),
            }),
        })
    }

    /// Get a connection from the pool.
    ///
    /// Returns a parked idle connection when a live one exists, otherwise
    /// creates a fresh one. At capacity the call waits for a release (FIFO,
    /// bounded by `acquire_timeout`) when `wait_on_exhaustion` is enabled,
    /// or fails immediately with [`PoolError::Exhausted`] when it is not.
    ///
    /// An idle connection that fails its checkout liveness probe is
    /// discarded silently and replaced by one creation attempt; a creation
    /// failure propagates as [`PoolError::Connect`].
    pub async fn get(&self) -> Result<PooledConnection, PoolError> {
        if self.is_closed() {
            return Err(PoolError::PoolClosed);
        }

        tracing::trace!("acquiring connection from pool");
        let permit = self.acquire_permit().await?;

        if let Some(mut conn) = self.inner.pop_idle()? {
            if !self.inner.config.test_on_checkout || conn.ping().await.is_ok() {
                tracing::trace!(id = conn.id(), "reusing idle connection");
                return Ok(PooledConnection::new(conn, permit, Arc::clone(&self.inner)));
            }
            // Probe failed: discard and fall through to one creation
            // attempt. A persistent outage will fail that attempt too, so
            // this cannot loop.
            tracing::debug!(id = conn.id(), "idle connection failed liveness probe, discarding");
        }

        let conn = Connection::connect(&self.inner.client_config)
            .await
            .map_err(PoolError::Connect)?;
        tracing::debug!(id = conn.id(), "created new pooled connection");
        Ok(PooledConnection::new(conn, permit, Arc::clone(&self.inner)))
    }

    async fn acquire_permit(&self) -> Result<OwnedSemaphorePermit, PoolError> {
        let semaphore = Arc::clone(&self.inner.semaphore);
        if self.inner.config.wait_on_exhaustion {
            match timeout(self.inner.config.acquire_timeout, semaphore.acquire_owned()).await {
                Ok(Ok(permit)) => Ok(permit),
                Ok(Err(_closed)) => Err(PoolError::PoolClosed),
                Err(_elapsed) => Err(PoolError::AcquireTimeout(self.inner.config.acquire_timeout)),
            }
        } else {
            semaphore.try_acquire_owned().map_err(|e| match e {
                TryAcquireError::NoPermits => PoolError::Exhausted {
                    max: self.inner.config.max_active,
                },
                TryAcquireError::Closed => PoolError::PoolClosed,
            })
        }
    }

    /// Get the current pool status.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        let available = self.inner.state.lock().idle.len() as u32;
        let max = self.inner.config.max_active;
        let in_use = max.saturating_sub(self.inner.semaphore.available_permits() as u32);
        PoolStatus {
            available,
            in_use,
            total: available + in_use,
            max,
        }
    }

    /// Close the pool.
    ///
    /// All idle connections are closed and blocked waiters fail with
    /// [`PoolError::PoolClosed`], as do subsequent [`Pool::get`] calls.
    /// Checked-out connections are not forcibly terminated; they are
    /// discarded as their guards release them.
    pub async fn close(&self) {
        let drained: Vec<Idle> = {
            let mut state = self.inner.state.lock();
            state.closed = true;
            state.idle.drain(..).collect()
        };
        let closed = drained.len();
        drop(drained);
        self.inner.semaphore.close();
        tracing::info!(idle_closed = closed, "connection pool closed");
    }

    /// Check if the pool is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// Get the pool configuration.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.status();
        f.debug_struct("Pool")
            .field("available", &status.available)
            .field("in_use", &status.in_use)
            .field("max", &status.max)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl PoolInner {
    /// Pop the next live idle connection, closing any that sat past the
    /// idle timeout on the way. Expired entries are never handed out.
    fn pop_idle(&self) -> Result<Option<Connection>, PoolError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(PoolError::PoolClosed);
        }
        while let Some(idle) = state.idle.pop_front() {
            if idle.expired(self.config.idle_timeout) {
                tracing::debug!(id = idle.conn.id(), "discarding idle connection past idle timeout");
                continue;
            }
            return Ok(Some(idle.conn));
        }
        Ok(None)
    }

    /// Take a connection back from a finished checkout.
    ///
    /// Healthy connections are parked for reuse while the idle queue has
    /// room; broken connections, and any connection released after the pool
    /// closed or beyond `max_idle`, are closed here. The pool is the only
    /// component that closes connections.
    fn release(&self, conn: Connection) {
        let mut state = self.state.lock();
        if state.closed {
            tracing::debug!(id = conn.id(), "pool closed, discarding released connection");
        } else if !conn.is_healthy() {
            tracing::debug!(id = conn.id(), "discarding connection released in broken state");
        } else if state.idle.len() >= self.config.max_idle as usize {
            tracing::debug!(id = conn.id(), "idle queue full, discarding released connection");
        } else {
            tracing::trace!(id = conn.id(), "parking released connection");
            state.idle.push_back(Idle {
                conn,
                parked_at: Instant::now(),
            });
        }
    }
}

/// Status information about the pool.
#[derive(Debug, Clone, Copy)]
pub struct PoolStatus {
    /// Number of idle connections available.
    pub available: u32,
    /// Number of checkouts currently outstanding.
    pub in_use: u32,
    /// Total number of connections the pool accounts for.
    pub total: u32,
    /// Maximum allowed concurrent checkouts.
    pub max: u32,
}

impl PoolStatus {
    /// Checked-out share of the capacity, as a percentage.
    #[must_use]
    pub fn utilization(&self) -> f64 {
        if self.max == 0 {
            0.0
        } else {
            f64::from(self.in_use) / f64::from(self.max) * 100.0
        }
    }
}

/// A connection checked out from the pool.
///
/// Dereferences to [`Connection`]. Dropping the guard returns the
/// connection to the pool exactly once, on every exit path: parked for
/// reuse when it is healthy and the idle queue has room, closed otherwise.
/// The capacity permit is released after the connection is parked, so a
/// woken waiter finds it.
pub struct PooledConnection {
    conn: Option<Connection>,
    pool: Arc<PoolInner>,
    _permit: OwnedSemaphorePermit,
}

impl PooledConnection {
    fn new(conn: Connection, permit: OwnedSemaphorePermit, pool: Arc<PoolInner>) -> Self {
        Self {
            conn: Some(conn),
            pool,
            _permit: permit,
        }
    }
}

// The Option is only vacated inside Drop; between construction and drop the
// connection is always present.
#[allow(clippy::expect_used)]
impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("connection present until drop")
    }
}

#[allow(clippy::expect_used)]
impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("connection present until drop")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
        // The permit field drops after this body, freeing the capacity slot
        // only once the connection is back in the idle queue.
    }
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("conn", &self.conn)
            .finish_non_exhaustive()
    }
}
