//! Aggregate error types returned to callers.

use beaconrpc_core::Capability;
use thiserror::Error;

use crate::aggregate::FailureReport;
use crate::reconcile::ConsensusMismatch;

/// The failure outcome of one logical call.
///
/// Individual provider errors never appear here on their own; they are
/// always carried inside a [`FailureReport`].
#[derive(Debug, Error)]
pub enum MultiError {
    /// No active provider advertises the requested operation.
    #[error("no active provider for {capability} ({inactive} inactive)")]
    CapabilityUnavailable { capability: Capability, inactive: usize },

    /// Every eligible provider failed.
    #[error("all {} providers failed: {}", .0.len(), .0)]
    AllProvidersFailed(FailureReport),

    /// Providers answered but their answers could not be reconciled.
    #[error(transparent)]
    ConsensusMismatch(#[from] ConsensusMismatch),

    /// The caller's deadline elapsed before the call resolved.
    #[error("deadline exceeded after {ms}ms")]
    DeadlineExceeded { ms: u64 },

    /// The caller cancelled the call before it resolved.
    #[error("call cancelled")]
    Cancelled,
}

impl MultiError {
    /// Per-provider failures carried by this error, if any.
    pub fn failures(&self) -> Option<&FailureReport> {
        match self {
            Self::AllProvidersFailed(report) => Some(report),
            Self::ConsensusMismatch(mismatch) => Some(&mismatch.divergent),
            _ => None,
        }
    }

    /// Returns `true` if retrying later might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::AllProvidersFailed(report) => {
                report.failures().iter().any(|f| f.error.is_retryable())
            }
            Self::DeadlineExceeded { .. } | Self::CapabilityUnavailable { .. } => true,
            Self::ConsensusMismatch(_) | Self::Cancelled => false,
        }
    }
}

/// Errors raised while building a client from configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("provider registered twice: {0}")]
    DuplicateProvider(String),

    #[error("provider {0} has no capabilities")]
    NoCapabilities(String),

    #[error("provider {provider} does not advertise {capability}")]
    UnsupportedCapability { provider: String, capability: Capability },
}
