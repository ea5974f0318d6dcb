//! Tracing / logging initialisation helpers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log level per component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Global default level: "trace" | "debug" | "info" | "warn" | "error"
    #[serde(default = "default_level")]
    pub level: String,
    /// Override per component: crate name → level
    #[serde(default)]
    pub components: HashMap<String, String>,
    /// Emit JSON structured logs (true) or human-readable text (false)
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            components: HashMap::new(),
            json: false,
        }
    }
}

impl LogConfig {
    /// Filter directives, e.g. `"info,beaconrpc_multi=debug"`.
    pub fn directives(&self) -> String {
        let mut directives = self.level.clone();
        let mut components: Vec<_> = self.components.iter().collect();
        components.sort();
        for (component, level) in components {
            directives.push_str(&format!(",{}={}", component.replace('-', "_"), level));
        }
        directives
    }
}

fn env_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_new(config.directives()).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber, returning an error if one is already set.
pub fn try_init_tracing(config: &LogConfig) -> Result<(), TryInitError> {
    if config.json {
        tracing_subscriber::registry()
            .with(env_filter(config))
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter(config))
            .with(fmt::layer())
            .try_init()
    }
}

/// Initialise tracing with the given log config.
/// Should be called once at application startup; panics if a global
/// subscriber is already installed.
pub fn init_tracing(config: &LogConfig) {
    if config.json {
        tracing_subscriber::registry()
            .with(env_filter(config))
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter(config))
            .with(fmt::layer())
            .init();
    }
}
