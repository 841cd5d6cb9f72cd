//! # resp-protocol
//!
//! Pure RESP2 wire model for Redis-compatible stores.
//!
//! This crate knows nothing about sockets or pooling. It provides:
//!
//! - [`Command`]: a command name plus arguments, encoded as a RESP array of
//!   bulk strings.
//! - [`Value`]: the reply sum type (simple string, error, integer, bulk,
//!   nil, array) with an incremental decoder and typed `into_*` conversion
//!   paths so callers never cast raw replies at runtime.
//! - [`ProtocolError`]: malformed-frame and unexpected-reply-shape failures.
//!
//! The decoder is incremental: [`Value::decode`] returns `Ok(None)` on
//! incomplete input without consuming anything, which makes it usable both
//! behind a `tokio_util` codec and in a hand-rolled read loop.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod command;
pub mod error;
pub mod value;

pub use command::Command;
pub use error::ProtocolError;
pub use value::Value;
