//! Per-provider health: Active → Inactive → probe → Active.
//!
//! State transitions:
//! - `Active` → `Inactive`:  consecutive failures reach `failure_threshold`
//! - `Inactive` → probe:     `cooldown` has elapsed; one call is admitted
//! - probe → `Active`:       the probe call succeeds
//! - probe → `Inactive`:     the probe call fails; cooldown restarts

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use crate::registry::ProviderId;

/// Health state of a single provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    /// Eligible for dispatch.
    Active,
    /// Excluded from dispatch until the cooldown elapses.
    Inactive,
}

impl std::fmt::Display for HealthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Inactive => write!(f, "inactive"),
        }
    }
}

/// Aggregate health across every registered provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Every provider is active.
    Healthy,
    /// Some providers are inactive.
    Degraded,
    /// No provider is active.
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Configuration shared by every provider's health tracker.
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Consecutive failures before a provider becomes inactive.
    pub failure_threshold: u32,
    /// How long an inactive provider waits before one probe is admitted.
    pub cooldown: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown: Duration::from_secs(30),
        }
    }
}

/// How a provider was admitted to a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The provider was active.
    Normal,
    /// The provider was inactive and this call holds its single probe slot.
    Probe,
}

/// Point-in-time view of one provider's health.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthSnapshot {
    pub state: HealthState,
    pub consecutive_failures: u32,
    pub last_failure: Option<Instant>,
    /// A probe call is currently in flight.
    pub probing: bool,
}

struct HealthInner {
    state: HealthState,
    consecutive_failures: u32,
    last_failure: Option<Instant>,
    inactive_since: Option<Instant>,
    probing: bool,
}

/// Thread-safe health tracker for one provider.
///
/// Each provider owns its own lock, so a slow or failing provider never
/// blocks health updates for the others.
pub struct ProviderHealth {
    provider: ProviderId,
    config: HealthConfig,
    inner: Mutex<HealthInner>,
}

impl ProviderHealth {
    /// Create a tracker in `Active` state.
    pub fn new(provider: ProviderId, config: HealthConfig) -> Self {
        Self {
            provider,
            config,
            inner: Mutex::new(HealthInner {
                state: HealthState::Active,
                consecutive_failures: 0,
                last_failure: None,
                inactive_since: None,
                probing: false,
            }),
        }
    }

    pub fn state(&self) -> HealthState {
        self.inner.lock().unwrap().state
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        let inner = self.inner.lock().unwrap();
        HealthSnapshot {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            last_failure: inner.last_failure,
            probing: inner.probing,
        }
    }

    /// Decide whether the provider may take part in a dispatch.
    ///
    /// Always admits while active. While inactive, admits exactly one
    /// [`Admission::Probe`] once the cooldown has elapsed; the holder must
    /// settle it with a success, a failure, or [`release`](Self::release).
    pub fn try_admit(&self) -> Option<Admission> {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            HealthState::Active => Some(Admission::Normal),
            HealthState::Inactive => {
                if inner.probing {
                    return None;
                }
                let cooled = inner
                    .inactive_since
                    .map_or(true, |since| since.elapsed() >= self.config.cooldown);
                if !cooled {
                    return None;
                }
                inner.probing = true;
                tracing::info!(provider = %self.provider, "cooldown elapsed, admitting probe");
                Some(Admission::Probe)
            }
        }
    }

    /// Record a successful call.
    pub fn record_success(&self, admission: Admission) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state == HealthState::Inactive {
            tracing::info!(provider = %self.provider, "provider → active");
        }
        inner.state = HealthState::Active;
        inner.consecutive_failures = 0;
        inner.inactive_since = None;
        if admission == Admission::Probe {
            inner.probing = false;
        }
    }

    /// Record a failed call.
    pub fn record_failure(&self, admission: Admission) {
        let mut inner = self.inner.lock().unwrap();
        let now = Instant::now();
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        inner.last_failure = Some(now);
        if admission == Admission::Probe {
            inner.probing = false;
        }
        match inner.state {
            HealthState::Active => {
                if inner.consecutive_failures >= self.config.failure_threshold {
                    inner.state = HealthState::Inactive;
                    inner.inactive_since = Some(now);
                    tracing::warn!(
                        provider = %self.provider,
                        failures = inner.consecutive_failures,
                        "provider → inactive"
                    );
                }
            }
            // A call admitted before deactivation failing late leaves the
            // cooldown and any probe in flight alone.
            HealthState::Inactive if admission == Admission::Probe => {
                inner.inactive_since = Some(now);
                tracing::warn!(provider = %self.provider, "probe failed → inactive");
            }
            HealthState::Inactive => {}
        }
    }

    /// Settle a call that never completed, giving back its probe slot if it held one.
    pub fn release(&self, admission: Admission) {
        if admission == Admission::Probe {
            self.inner.lock().unwrap().probing = false;
        }
    }
}

impl std::fmt::Debug for ProviderHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderHealth")
            .field("provider", &self.provider)
            .field("state", &self.state())
            .finish()
    }
}
