//! # redis-driver-client
//!
//! Async connection layer for Redis-compatible key-value stores.
//!
//! A [`Connection`] is one authenticated, database-selected session over
//! TCP. Creating one performs the full handshake — transport connect,
//! optional `AUTH`, optional `SELECT` — with every phase bounded by the
//! configured timeouts, so a stalled server cannot hang connection
//! establishment any more than it can hang a command.
//!
//! Each connection serves one request/response exchange at a time (the
//! methods take `&mut self`); concurrency comes from holding several
//! connections, which is the job of the `redis-driver-pool` crate. The
//! connection tracks its own health: any timeout, transport fault, or
//! protocol-level surprise marks it broken, and a pool consults that flag
//! when the connection comes back.
//!
//! ## Example
//!
//! ```rust,ignore
//! use redis_driver_client::{Config, Connection};
//!
//! let config = Config::from_url("redis://:secret@localhost:6379/2")?;
//! let mut conn = Connection::connect(&config).await?;
//!
//! conn.set("greeting", b"hello").await?;
//! assert_eq!(conn.get("greeting").await?.as_deref(), Some(&b"hello"[..]));
//! assert_eq!(conn.get("missing").await?, None);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod codec;
pub mod commands;
pub mod config;
pub mod connection;
pub mod error;

pub use codec::RespCodec;
pub use config::{Config, TimeoutConfig};
pub use connection::Connection;
pub use error::{Error, Result};
pub use resp_protocol::{Command, ProtocolError, Value};
