//! Pool configuration.

use std::time::Duration;

use crate::error::PoolError;

/// Configuration for the connection pool.
///
/// Immutable once the pool is constructed. This struct is marked
/// `#[non_exhaustive]` to allow adding new fields in future minor versions
/// without breaking changes; use the builder methods or
/// [`Default::default()`] to construct instances.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct PoolConfig {
    /// Maximum number of connections checked out at once.
    pub max_active: u32,

    /// Maximum number of idle connections kept for reuse. Connections
    /// released beyond this are closed.
    pub max_idle: u32,

    /// Time a connection may sit idle before being discarded instead of
    /// handed out. Keep this below the server's own idle timeout: a
    /// connection the server has silently dropped is useless to hold.
    pub idle_timeout: Duration,

    /// When the pool is at capacity: wait for a release (true) or fail
    /// immediately with [`PoolError::Exhausted`] (false).
    pub wait_on_exhaustion: bool,

    /// Upper bound on the wait when `wait_on_exhaustion` is enabled.
    pub acquire_timeout: Duration,

    /// Whether to PING idle connections before handing them out.
    pub test_on_checkout: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_active: 10,
            max_idle: 10,
            idle_timeout: Duration::from_secs(300),
            wait_on_exhaustion: true,
            acquire_timeout: Duration::from_secs(30),
            test_on_checkout: true,
        }
    }
}

impl PoolConfig {
    /// Create a new pool configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of concurrently checked-out connections.
    #[must_use]
    pub fn max_active(mut self, count: u32) -> Self {
        self.max_active = count;
        self
    }

    /// Set the maximum number of idle connections kept for reuse.
    #[must_use]
    pub fn max_idle(mut self, count: u32) -> Self {
        self.max_idle = count;
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Enable or disable waiting when the pool is at capacity.
    #[must_use]
    pub fn wait_on_exhaustion(mut self, wait: bool) -> Self {
        self.wait_on_exhaustion = wait;
        self
    }

    /// Set the upper bound on the wait for a free connection.
    #[must_use]
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Enable or disable the PING liveness probe on checkout.
    #[must_use]
    pub fn test_on_checkout(mut self, enabled: bool) -> Self {
        self.test_on_checkout = enabled;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.max_active == 0 {
            return Err(PoolError::Configuration(
                "max_active must be greater than 0".into(),
            ));
        }
        if self.max_idle > self.max_active {
            return Err(PoolError::Configuration(
                "max_idle cannot be greater than max_active".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PoolConfig::default();
        assert_eq!(config.max_active, 10);
        assert_eq!(config.max_idle, 10);
        assert!(config.wait_on_exhaustion);
        assert!(config.test_on_checkout);
    }

    #[test]
    fn test_config_builder_methods() {
        let config = PoolConfig::new()
            .max_active(50)
            .max_idle(5)
            .idle_timeout(Duration::from_secs(120))
            .wait_on_exhaustion(false)
            .acquire_timeout(Duration::from_secs(60))
            .test_on_checkout(false);

        assert_eq!(config.max_active, 50);
        assert_eq!(config.max_idle, 5);
        assert_eq!(config.idle_timeout, Duration::from_secs(120));
        assert!(!config.wait_on_exhaustion);
        assert_eq!(config.acquire_timeout, Duration::from_secs(60));
        assert!(!config.test_on_checkout);
    }

    #[test]
    fn test_config_validation_success() {
        let config = PoolConfig::new().max_active(10).max_idle(10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_zero_max_active() {
        let config = PoolConfig::new().max_active(0);
        let result = config.validate();
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("max_active must be greater than 0")
        );
    }

    #[test]
    fn test_config_validation_idle_above_active() {
        let config = PoolConfig::new().max_active(2).max_idle(3);
        let result = config.validate();
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("max_idle cannot be greater than max_active")
        );
    }
}
