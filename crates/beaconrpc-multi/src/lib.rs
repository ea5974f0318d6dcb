//! beaconrpc-multi — one beacon-node client over many providers.
//!
//! # Overview
//!
//! A [`MultiClient`] holds a fixed list of [`BeaconProvider`] connections.
//! Every logical call is fanned out to the providers that advertise the
//! operation and are currently healthy, and resolved according to a
//! reconciliation [`Strategy`]:
//!
//! - `first_success` (default) — race the providers, return the first
//!   successful answer and cancel the rest
//! - `unanimous`, `majority`, `quorum(n)` — wait for every provider (or the
//!   deadline) and compare the answers
//!
//! Providers that fail repeatedly are taken out of rotation and probed
//! again after a cooldown. When a call fails, the returned [`MultiError`]
//! carries the individual error of every provider involved.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use beaconrpc_multi::{BeaconProvider, CallContext, Epoch, MultiClient};
//!
//! # async fn run(a: Arc<dyn BeaconProvider>, b: Arc<dyn BeaconProvider>) -> Result<(), Box<dyn std::error::Error>> {
//! let client = MultiClient::builder().provider(a).provider(b).build()?;
//! let duties = client
//!     .proposer_duties(&CallContext::new(), Epoch(1), &[])
//!     .await?;
//! # let _ = duties;
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod client;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod logging;
pub mod reconcile;
pub mod registry;

mod ops;

pub use aggregate::{FailureReport, ProviderFailure};
pub use client::{MultiClient, MultiClientBuilder};
pub use config::ClientConfig;
pub use context::CallContext;
pub use dispatch::{CallFuture, Dispatcher, ProviderOutcome};
pub use error::{ConfigError, MultiError};
pub use health::{Admission, HealthConfig, HealthSnapshot, HealthState, HealthStatus};
pub use logging::{init_tracing, try_init_tracing, LogConfig};
pub use reconcile::{ConsensusMismatch, Reconciler, Strategy};
pub use registry::{ProviderEntry, ProviderHandle, ProviderHealthSnapshot, ProviderId, ProviderRegistry};

pub use beaconrpc_core::{
    BeaconProvider, BlockId, Capability, CapabilitySet, Epoch, Gwei, ProposerDuty, ProviderError,
    Root, SignedAggregateAndProof, Slot, StateId, SyncCommitteeContribution, ValidatorIndex,
};
