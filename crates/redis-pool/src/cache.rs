//! Typed command facade over the pool.
//!
//! Every operation follows the same template: check a connection out of the
//! pool, run one request/response exchange (one batched exchange for the
//! multi-field hash operations), and let the guard's drop return the
//! connection — with its health already recorded by the exchange — on every
//! exit path.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

use crate::error::PoolError;
use crate::pool::Pool;

/// Errors a facade operation can produce: either the pool could not provide
/// a connection, or the command exchange itself failed.
///
/// Key and field absence is not an error; it appears as `None` (or `false`)
/// in the typed results.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Checkout failed.
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// The command exchange failed.
    #[error(transparent)]
    Command(#[from] redis_driver_client::Error),
}

/// Result type for facade operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Typed operations on strings, hashes, and sets, backed by a shared pool.
///
/// `Cache` is an explicitly constructed instance — hold one for the process
/// lifetime if that suits, but nothing here is a process-wide singleton.
/// Clones share the same pool.
#[derive(Debug, Clone)]
pub struct Cache {
    pool: Arc<Pool>,
}

impl Cache {
    /// Build a facade over the given pool.
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// The underlying pool, for status inspection or direct checkout.
    #[must_use]
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Close the underlying pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Store a byte-string value under `key`.
    pub async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut conn = self.pool.get().await?;
        Ok(conn.set(key, value).await?)
    }

    /// Fetch the value under `key`, or `None` if the key is absent.
    pub async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let mut conn = self.pool.get().await?;
        Ok(conn.get(key).await?)
    }

    /// Whether `key` is present.
    pub async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.pool.get().await?;
        Ok(conn.exists(key).await?)
    }

    /// Increment the integer value under `key` by one, returning the new
    /// value. Fails if the stored value is not representable as an integer.
    pub async fn incr(&self, key: &str) -> Result<i64> {
        let mut conn = self.pool.get().await?;
        Ok(conn.incr(key).await?)
    }

    /// Set a time-to-live on `key` in whole seconds. A zero or negative TTL
    /// is passed through literally; the store's own semantics apply.
    pub async fn expire(&self, key: &str, ttl_seconds: i64) -> Result<()> {
        let mut conn = self.pool.get().await?;
        Ok(conn.expire(key, ttl_seconds).await?)
    }

    /// Delete the given keys, returning whether anything was removed.
    pub async fn del(&self, keys: &[&str]) -> Result<bool> {
        let mut conn = self.pool.get().await?;
        Ok(conn.del(keys).await?)
    }

    /// Length in bytes of the value under `key` (0 when absent).
    pub async fn strlen(&self, key: &str) -> Result<i64> {
        let mut conn = self.pool.get().await?;
        Ok(conn.strlen(key).await?)
    }

    /// Remove `field` from the hash at `key`, returning whether it was
    /// present.
    pub async fn hdel(&self, key: &str, field: &str) -> Result<bool> {
        let mut conn = self.pool.get().await?;
        Ok(conn.hdel(key, field).await?)
    }

    /// Whether `field` is present in the hash at `key`.
    pub async fn hexists(&self, key: &str, field: &str) -> Result<bool> {
        let mut conn = self.pool.get().await?;
        Ok(conn.hexists(key, field).await?)
    }

    /// Number of fields in the hash at `key`.
    pub async fn hlen(&self, key: &str) -> Result<i64> {
        let mut conn = self.pool.get().await?;
        Ok(conn.hlen(key).await?)
    }

    /// Fetch several hash fields in one batched exchange. The result is
    /// positional: element `i` corresponds to `fields[i]`, `None` marking
    /// absent fields.
    pub async fn hmget(&self, key: &str, fields: &[&str]) -> Result<Vec<Option<Bytes>>> {
        let mut conn = self.pool.get().await?;
        Ok(conn.hmget(key, fields).await?)
    }

    /// Store one field of the hash at `key`.
    pub async fn hset(&self, key: &str, field: &str, value: &[u8]) -> Result<()> {
        let mut conn = self.pool.get().await?;
        Ok(conn.hset(key, field, value).await?)
    }

    /// Store several hash fields in one batched exchange.
    pub async fn hmset(&self, key: &str, entries: &[(&str, &[u8])]) -> Result<()> {
        let mut conn = self.pool.get().await?;
        Ok(conn.hmset(key, entries).await?)
    }

    /// Fetch one hash field, or `None` if the field is absent.
    pub async fn hget(&self, key: &str, field: &str) -> Result<Option<Bytes>> {
        let mut conn = self.pool.get().await?;
        Ok(conn.hget(key, field).await?)
    }

    /// All members of the set at `key`, as raw byte strings. Callers decode
    /// members into their own types.
    pub async fn smembers(&self, key: &str) -> Result<Vec<Bytes>> {
        let mut conn = self.pool.get().await?;
        Ok(conn.smembers(key).await?)
    }

    /// Cardinality of the set at `key`.
    pub async fn scard(&self, key: &str) -> Result<i64> {
        let mut conn = self.pool.get().await?;
        Ok(conn.scard(key).await?)
    }
}
