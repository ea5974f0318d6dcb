//! Error aggregation — collects per-provider failures of one dispatch.

use beaconrpc_core::ProviderError;

use crate::registry::ProviderId;

/// One provider's failure within a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    pub provider: ProviderId,
    pub error: ProviderError,
}

impl std::fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.provider, self.error)
    }
}

/// Every provider failure encountered during one dispatch, kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureReport {
    failures: Vec<ProviderFailure>,
}

impl FailureReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, provider: ProviderId, error: ProviderError) {
        self.failures.push(ProviderFailure { provider, error });
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// The failures, in the order they were recorded.
    pub fn failures(&self) -> &[ProviderFailure] {
        &self.failures
    }

    /// Ids of the failing providers.
    pub fn providers(&self) -> impl Iterator<Item = &ProviderId> + '_ {
        self.failures.iter().map(|f| &f.provider)
    }

    /// The error reported by `provider`, if it failed.
    pub fn error_for(&self, provider: &str) -> Option<&ProviderError> {
        self.failures
            .iter()
            .find(|f| f.provider == provider)
            .map(|f| &f.error)
    }

    pub fn into_failures(self) -> Vec<ProviderFailure> {
        self.failures
    }
}

impl FromIterator<(ProviderId, ProviderError)> for FailureReport {
    fn from_iter<I: IntoIterator<Item = (ProviderId, ProviderError)>>(iter: I) -> Self {
        let mut report = Self::new();
        for (provider, error) in iter {
            report.push(provider, error);
        }
        report
    }
}

impl std::fmt::Display for FailureReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.failures.is_empty() {
            return write!(f, "no provider failures");
        }
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for FailureReport {}
