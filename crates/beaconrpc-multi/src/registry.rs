//! Provider registry — the fixed set of backend connections, their
//! capabilities and their health.

use std::collections::HashMap;
use std::sync::Arc;

use beaconrpc_core::{BeaconProvider, Capability, CapabilitySet, ProviderError};

use crate::error::ConfigError;
use crate::health::{
    Admission, HealthConfig, HealthSnapshot, HealthState, HealthStatus, ProviderHealth,
};

/// Stable identifier of a registered provider.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderId(Arc<str>);

impl ProviderId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Debug for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl PartialEq<&str> for ProviderId {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

/// A provider to register, with the capabilities it will be used for.
pub struct ProviderEntry {
    pub provider: Arc<dyn BeaconProvider>,
    pub capabilities: CapabilitySet,
}

impl ProviderEntry {
    /// Register the provider for everything it advertises.
    pub fn new(provider: Arc<dyn BeaconProvider>) -> Self {
        let capabilities = provider.capabilities();
        Self {
            provider,
            capabilities,
        }
    }

    /// Register the provider for a subset of what it advertises.
    pub fn with_capabilities(provider: Arc<dyn BeaconProvider>, capabilities: CapabilitySet) -> Self {
        Self {
            provider,
            capabilities,
        }
    }
}

struct ProviderSlot {
    id: ProviderId,
    provider: Arc<dyn BeaconProvider>,
    capabilities: CapabilitySet,
    health: ProviderHealth,
}

/// A provider admitted to one dispatch.
#[derive(Clone)]
pub struct ProviderHandle {
    /// Position in registration order.
    pub index: usize,
    pub id: ProviderId,
    pub provider: Arc<dyn BeaconProvider>,
    /// Whether this call holds the provider's probe slot.
    pub admission: Admission,
}

impl std::fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("index", &self.index)
            .field("id", &self.id)
            .field("admission", &self.admission)
            .finish()
    }
}

/// Health of one provider, as reported by [`ProviderRegistry::health_summary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderHealthSnapshot {
    pub id: ProviderId,
    pub capabilities: CapabilitySet,
    pub health: HealthSnapshot,
}

/// Immutable provider list plus capability index.
///
/// Only the per-provider health trackers mutate after construction, each
/// under its own lock.
pub struct ProviderRegistry {
    slots: Vec<ProviderSlot>,
    by_capability: HashMap<Capability, Vec<usize>>,
}

impl ProviderRegistry {
    /// Build the registry. Registration order is preserved and used as the
    /// stable iteration order of every dispatch.
    pub fn new(entries: Vec<ProviderEntry>, config: HealthConfig) -> Result<Self, ConfigError> {
        let mut slots: Vec<ProviderSlot> = Vec::with_capacity(entries.len());
        let mut by_capability: HashMap<Capability, Vec<usize>> = HashMap::new();

        for entry in entries {
            let id = ProviderId::new(entry.provider.name());
            if slots.iter().any(|s| s.id == id) {
                return Err(ConfigError::DuplicateProvider(id.to_string()));
            }
            if entry.capabilities.is_empty() {
                return Err(ConfigError::NoCapabilities(id.to_string()));
            }
            let advertised = entry.provider.capabilities();
            if let Some(capability) = entry.capabilities.iter().find(|c| !advertised.contains(*c)) {
                return Err(ConfigError::UnsupportedCapability {
                    provider: id.to_string(),
                    capability,
                });
            }

            let index = slots.len();
            for capability in entry.capabilities.iter() {
                by_capability.entry(capability).or_default().push(index);
            }
            tracing::debug!(provider = %id, capabilities = ?entry.capabilities, "registered provider");
            slots.push(ProviderSlot {
                health: ProviderHealth::new(id.clone(), config.clone()),
                id,
                provider: entry.provider,
                capabilities: entry.capabilities,
            });
        }

        Ok(Self {
            slots,
            by_capability,
        })
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if no providers are registered.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Provider ids in registration order.
    pub fn ids(&self) -> Vec<ProviderId> {
        self.slots.iter().map(|s| s.id.clone()).collect()
    }

    /// Number of providers advertising `capability`, regardless of health.
    pub fn advertising(&self, capability: Capability) -> usize {
        self.by_capability.get(&capability).map_or(0, Vec::len)
    }

    /// Providers advertising `capability` and admitted by their health
    /// tracker, in registration order.
    ///
    /// Admitting an inactive provider claims its single probe slot; the
    /// dispatcher settles every returned handle exactly once.
    pub fn eligible(&self, capability: Capability) -> Vec<ProviderHandle> {
        let Some(indices) = self.by_capability.get(&capability) else {
            return Vec::new();
        };
        indices
            .iter()
            .filter_map(|&i| {
                let slot = &self.slots[i];
                let admission = slot.health.try_admit()?;
                Some(ProviderHandle {
                    index: i,
                    id: slot.id.clone(),
                    provider: Arc::clone(&slot.provider),
                    admission,
                })
            })
            .collect()
    }

    /// Reset the provider's failure counter and mark it active.
    pub fn report_success(&self, handle: &ProviderHandle) {
        if let Some(slot) = self.slots.get(handle.index) {
            slot.health.record_success(handle.admission);
        }
    }

    /// Count one failure against the provider.
    pub fn report_failure(&self, handle: &ProviderHandle, error: &ProviderError) {
        if let Some(slot) = self.slots.get(handle.index) {
            tracing::debug!(provider = %slot.id, %error, "recording provider failure");
            slot.health.record_failure(handle.admission);
        }
    }

    /// Settle a call that never completed.
    pub fn release(&self, handle: &ProviderHandle) {
        if let Some(slot) = self.slots.get(handle.index) {
            slot.health.release(handle.admission);
        }
    }

    /// Health state of the provider with the given id.
    pub fn state_of(&self, id: &str) -> Option<HealthState> {
        self.slots
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.health.state())
    }

    /// Returns a summary of each provider's health, in registration order.
    pub fn health_summary(&self) -> Vec<ProviderHealthSnapshot> {
        self.slots
            .iter()
            .map(|s| ProviderHealthSnapshot {
                id: s.id.clone(),
                capabilities: s.capabilities,
                health: s.health.snapshot(),
            })
            .collect()
    }

    /// Overall health across every provider.
    pub fn health(&self) -> HealthStatus {
        let active = self
            .slots
            .iter()
            .filter(|s| s.health.state() == HealthState::Active)
            .count();
        match active {
            0 => HealthStatus::Unhealthy,
            n if n == self.slots.len() => HealthStatus::Healthy,
            _ => HealthStatus::Degraded,
        }
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.ids())
            .finish()
    }
}
