//! Typed command operations.
//!
//! Each operation is one request/response exchange (one batched exchange for
//! the multi-field hash operations) with the reply decoded into a typed
//! result. Absence is data, not a fault: a missing key or field decodes to
//! `None` (or `false` for existence checks), never to an error and never to
//! an empty byte string.

use bytes::Bytes;
use resp_protocol::Command;

use crate::connection::Connection;
use crate::error::Result;

impl Connection {
    /// SET: store a byte-string value under `key`.
    pub async fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        let reply = self.command(&Command::new("SET").arg(key).arg(value)).await?;
        self.decoded(reply.into_status())?;
        Ok(())
    }

    /// GET: fetch the value under `key`, or `None` if the key is absent.
    pub async fn get(&mut self, key: &str) -> Result<Option<Bytes>> {
        let reply = self.command(&Command::new("GET").arg(key)).await?;
        self.decoded(reply.into_optional_bytes())
    }

    /// EXISTS: whether `key` is present.
    pub async fn exists(&mut self, key: &str) -> Result<bool> {
        let reply = self.command(&Command::new("EXISTS").arg(key)).await?;
        self.decoded(reply.into_boolean())
    }

    /// INCR: increment the integer value under `key` by one, returning the
    /// new value. Fails with a protocol error if the stored value is not
    /// representable as an integer.
    pub async fn incr(&mut self, key: &str) -> Result<i64> {
        let reply = self.command(&Command::new("INCR").arg(key)).await?;
        self.decoded(reply.into_integer())
    }

    /// EXPIRE: set a time-to-live on `key` in whole seconds.
    ///
    /// A zero or negative TTL is passed through literally; the store's own
    /// semantics for non-positive TTLs apply.
    pub async fn expire(&mut self, key: &str, ttl_seconds: i64) -> Result<()> {
        let reply = self
            .command(&Command::new("EXPIRE").arg(key).arg_int(ttl_seconds))
            .await?;
        self.decoded(reply.into_integer())?;
        Ok(())
    }

    /// DEL: delete the given keys, returning whether anything was removed.
    pub async fn del(&mut self, keys: &[&str]) -> Result<bool> {
        let mut cmd = Command::new("DEL");
        for key in keys {
            cmd = cmd.arg(key);
        }
        let reply = self.command(&cmd).await?;
        self.decoded(reply.into_boolean())
    }

    /// STRLEN: length in bytes of the value under `key` (0 when absent).
    pub async fn strlen(&mut self, key: &str) -> Result<i64> {
        let reply = self.command(&Command::new("STRLEN").arg(key)).await?;
        self.decoded(reply.into_integer())
    }

    /// HDEL: remove `field` from the hash at `key`, returning whether it
    /// was present.
    pub async fn hdel(&mut self, key: &str, field: &str) -> Result<bool> {
        let reply = self
            .command(&Command::new("HDEL").arg(key).arg(field))
            .await?;
        self.decoded(reply.into_boolean())
    }

    /// HEXISTS: whether `field` is present in the hash at `key`.
    pub async fn hexists(&mut self, key: &str, field: &str) -> Result<bool> {
        let reply = self
            .command(&Command::new("HEXISTS").arg(key).arg(field))
            .await?;
        self.decoded(reply.into_boolean())
    }

    /// HLEN: number of fields in the hash at `key`.
    pub async fn hlen(&mut self, key: &str) -> Result<i64> {
        let reply = self.command(&Command::new("HLEN").arg(key)).await?;
        self.decoded(reply.into_integer())
    }

    /// HMGET: fetch several hash fields in one batched exchange.
    ///
    /// The result is positional: element `i` corresponds to `fields[i]`,
    /// with `None` for absent fields rather than omission.
    pub async fn hmget(&mut self, key: &str, fields: &[&str]) -> Result<Vec<Option<Bytes>>> {
        let mut cmd = Command::new("HMGET").arg(key);
        for field in fields {
            cmd = cmd.arg(field);
        }
        let reply = self.command(&cmd).await?;
        let items = self.decoded(reply.into_array())?;
        items
            .into_iter()
            .map(|item| self.decoded(item.into_optional_bytes()))
            .collect()
    }

    /// HSET: store one field of the hash at `key`.
    pub async fn hset(&mut self, key: &str, field: &str, value: &[u8]) -> Result<()> {
        let reply = self
            .command(&Command::new("HSET").arg(key).arg(field).arg(value))
            .await?;
        self.decoded(reply.into_integer())?;
        Ok(())
    }

    /// HMSET: store several hash fields in one batched exchange, flattening
    /// the mapping to the wire format the store expects.
    pub async fn hmset(&mut self, key: &str, entries: &[(&str, &[u8])]) -> Result<()> {
        let mut cmd = Command::new("HMSET").arg(key);
        for (field, value) in entries {
            cmd = cmd.arg(field).arg(value);
        }
        let reply = self.command(&cmd).await?;
        self.decoded(reply.into_status())?;
        Ok(())
    }

    /// HGET: fetch one hash field, or `None` if the field is absent.
    pub async fn hget(&mut self, key: &str, field: &str) -> Result<Option<Bytes>> {
        let reply = self
            .command(&Command::new("HGET").arg(key).arg(field))
            .await?;
        self.decoded(reply.into_optional_bytes())
    }

    /// SMEMBERS: all members of the set at `key`, as raw byte strings.
    ///
    /// Members come back untyped at this layer; callers that stored numbers
    /// or structured values do their own decoding.
    pub async fn smembers(&mut self, key: &str) -> Result<Vec<Bytes>> {
        let reply = self.command(&Command::new("SMEMBERS").arg(key)).await?;
        let items = self.decoded(reply.into_array())?;
        items
            .into_iter()
            .map(|item| self.decoded(item.into_bytes()))
            .collect()
    }

    /// SCARD: cardinality of the set at `key`.
    pub async fn scard(&mut self, key: &str) -> Result<i64> {
        let reply = self.command(&Command::new("SCARD").arg(key)).await?;
        self.decoded(reply.into_integer())
    }
}
