//! # redis-driver-testing
//!
//! Test infrastructure for driver development: an in-process mock server
//! speaking enough RESP to exercise connections, pools, and the command
//! facade without a real store.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod mock_server;

pub use mock_server::{MockRedisServer, MockServerError};
