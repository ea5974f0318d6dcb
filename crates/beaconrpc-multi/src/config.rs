//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::health::HealthConfig;
use crate::reconcile::Strategy;

/// Tunables of a [`MultiClient`](crate::MultiClient).
///
/// Every field has a default, so a partial JSON document is valid:
///
/// ```
/// use beaconrpc_multi::{ClientConfig, Strategy};
///
/// let config = ClientConfig::from_json(r#"{ "failure_threshold": 5, "default_strategy": "majority" }"#).unwrap();
/// assert_eq!(config.failure_threshold, 5);
/// assert_eq!(config.default_strategy, Strategy::Majority);
/// assert_eq!(config.max_parallelism, 16);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Maximum provider calls in flight at once, across all dispatches.
    pub max_parallelism: usize,
    /// Consecutive failures before a provider becomes inactive.
    pub failure_threshold: u32,
    /// Cooldown before an inactive provider is probed again (milliseconds).
    pub cooldown_ms: u64,
    /// How long cancelled provider tasks may linger before being aborted (milliseconds).
    pub grace_ms: u64,
    /// Deadline applied to calls whose context has none (milliseconds).
    pub request_timeout_ms: u64,
    /// Reconciliation strategy used when a call does not override it.
    pub default_strategy: Strategy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_parallelism: 16,
            failure_threshold: 3,
            cooldown_ms: 30_000,
            grace_ms: 250,
            request_timeout_ms: 30_000,
            default_strategy: Strategy::FirstSuccess,
        }
    }
}

impl ClientConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_parallelism == 0 {
            return Err(ConfigError::Invalid("max_parallelism must be at least 1".into()));
        }
        if self.failure_threshold == 0 {
            return Err(ConfigError::Invalid("failure_threshold must be at least 1".into()));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid("request_timeout_ms must be positive".into()));
        }
        if self.default_strategy == Strategy::Quorum(0) {
            return Err(ConfigError::Invalid("quorum size must be at least 1".into()));
        }
        Ok(())
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn health(&self) -> HealthConfig {
        HealthConfig {
            failure_threshold: self.failure_threshold,
            cooldown: self.cooldown(),
        }
    }
}
