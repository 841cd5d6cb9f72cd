//! Pool error types.

use thiserror::Error;

/// Errors that can occur during pool operations.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Waiting for a free connection exceeded the acquire timeout.
    #[error("connection acquisition timed out after {0:?}")]
    AcquireTimeout(std::time::Duration),

    /// Pool is closed.
    #[error("pool is closed")]
    PoolClosed,

    /// Capacity reached and waiting is disabled.
    #[error("pool exhausted: all {max} connections in use")]
    Exhausted {
        /// Maximum allowed concurrent checkouts.
        max: u32,
    },

    /// Creating a fresh connection failed (transport, authentication, or
    /// database selection).
    #[error("failed to create connection: {0}")]
    Connect(#[source] redis_driver_client::Error),

    /// Pool configuration error.
    #[error("pool configuration error: {0}")]
    Configuration(String),
}
