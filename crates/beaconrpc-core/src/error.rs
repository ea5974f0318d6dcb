//! Provider-level error types.

use thiserror::Error;

use crate::capability::Capability;

/// Errors a single provider can report for one call.
///
/// These never reach the caller on their own: the dispatch layer folds them
/// into an aggregate error together with the identity of the provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Connection-level failure (refused, reset, TLS, ...).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The node answered with an API error.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The node did not answer in time.
    #[error("request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// Response could not be decoded into the domain type.
    #[error("decode error: {0}")]
    Decode(String),

    /// The provider does not implement the operation.
    #[error("operation not supported: {0}")]
    Unsupported(Capability),

    /// The provider call panicked.
    #[error("provider panicked: {0}")]
    Panicked(String),

    /// The call was abandoned before it completed.
    #[error("call cancelled")]
    Cancelled,

    /// The provider answered, but its value disagrees with the others.
    #[error("divergent value: {value}")]
    Divergent { value: String },

    /// An unexpected error.
    #[error("{0}")]
    Other(String),
}

impl ProviderError {
    /// Returns `true` if this error is transient and worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout { .. } => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the provider produced an answer that lost a vote.
    pub fn is_divergence(&self) -> bool {
        matches!(self, Self::Divergent { .. })
    }
}

/// Errors raised while parsing domain identifiers from strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("invalid hex: {0}")]
    Hex(String),

    #[error("expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("invalid identifier: {0:?}")]
    InvalidId(String),
}
