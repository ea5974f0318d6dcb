//! `MultiClient` — the caller-facing entry point.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use beaconrpc_core::{BeaconProvider, Capability, CapabilitySet};

use crate::config::ClientConfig;
use crate::context::CallContext;
use crate::dispatch::{CallFuture, Dispatcher};
use crate::error::{ConfigError, MultiError};
use crate::health::HealthStatus;
use crate::reconcile::{Reconciler, Strategy};
use crate::registry::{ProviderEntry, ProviderHealthSnapshot, ProviderRegistry};

/// A beacon-node client backed by several providers.
///
/// Each operation method fans out to the providers advertising it and
/// resolves to a single value or a [`MultiError`].
#[derive(Debug)]
pub struct MultiClient {
    dispatcher: Dispatcher,
    config: ClientConfig,
}

impl MultiClient {
    pub fn builder() -> MultiClientBuilder {
        MultiClientBuilder::default()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn registry(&self) -> &ProviderRegistry {
        self.dispatcher.registry()
    }

    /// Overall health across every provider.
    pub fn health(&self) -> HealthStatus {
        self.registry().health()
    }

    /// Returns a summary of each provider's health.
    pub fn health_summary(&self) -> Vec<ProviderHealthSnapshot> {
        self.registry().health_summary()
    }

    /// Dispatch with the call's strategy, or the configured default.
    pub(crate) async fn call<V, F>(
        &self,
        ctx: &CallContext,
        capability: Capability,
        call: F,
    ) -> Result<V, MultiError>
    where
        V: PartialEq + Debug + Send + 'static,
        F: Fn(Arc<dyn BeaconProvider>) -> CallFuture<V> + Send + Sync + 'static,
    {
        let strategy = ctx.strategy().unwrap_or(self.config.default_strategy);
        self.call_with(ctx, capability, strategy, call).await
    }

    /// Dispatch with an explicit strategy, ignoring the call's override.
    pub(crate) async fn call_with<V, F>(
        &self,
        ctx: &CallContext,
        capability: Capability,
        strategy: Strategy,
        call: F,
    ) -> Result<V, MultiError>
    where
        V: PartialEq + Debug + Send + 'static,
        F: Fn(Arc<dyn BeaconProvider>) -> CallFuture<V> + Send + Sync + 'static,
    {
        let reconciler: Option<&dyn Reconciler<V>> = match strategy {
            Strategy::FirstSuccess => None,
            _ => Some(&strategy),
        };
        self.dispatcher
            .dispatch(ctx, capability, reconciler, call)
            .await
    }
}

/// Builder for [`MultiClient`]. Providers are dispatched to in the order
/// they are added.
#[derive(Default)]
pub struct MultiClientBuilder {
    config: ClientConfig,
    entries: Vec<ProviderEntry>,
}

impl MultiClientBuilder {
    /// Replace every tunable with `config`.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_parallelism(mut self, n: usize) -> Self {
        self.config.max_parallelism = n;
        self
    }

    pub fn failure_threshold(mut self, k: u32) -> Self {
        self.config.failure_threshold = k;
        self
    }

    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.config.cooldown_ms = millis(cooldown);
        self
    }

    pub fn grace(mut self, grace: Duration) -> Self {
        self.config.grace_ms = millis(grace);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout_ms = millis(timeout);
        self
    }

    pub fn default_strategy(mut self, strategy: Strategy) -> Self {
        self.config.default_strategy = strategy;
        self
    }

    /// Register a provider for every capability it advertises.
    pub fn provider(mut self, provider: Arc<dyn BeaconProvider>) -> Self {
        self.entries.push(ProviderEntry::new(provider));
        self
    }

    /// Register a provider for a subset of the capabilities it advertises.
    pub fn provider_with_capabilities(
        mut self,
        provider: Arc<dyn BeaconProvider>,
        capabilities: CapabilitySet,
    ) -> Self {
        self.entries
            .push(ProviderEntry::with_capabilities(provider, capabilities));
        self
    }

    pub fn build(self) -> Result<MultiClient, ConfigError> {
        self.config.validate()?;
        let registry = ProviderRegistry::new(self.entries, self.config.health())?;
        tracing::info!(
            providers = registry.len(),
            strategy = %self.config.default_strategy,
            "multi client ready"
        );
        Ok(MultiClient {
            dispatcher: Dispatcher::new(Arc::new(registry), &self.config),
            config: self.config,
        })
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
