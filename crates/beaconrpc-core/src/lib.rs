//! beaconrpc-core — foundation traits and types for BeaconRPC.
//!
//! # Overview
//!
//! BeaconRPC is a client-side access layer over several independently
//! operated beacon nodes that expose the same logical API. The core crate
//! defines what every backend connection looks like to the dispatch layer:
//!
//! - [`BeaconProvider`] — the async trait every backend client implements
//! - [`Capability`] / [`CapabilitySet`] — which operations a provider serves
//! - [`ProviderError`] — structured per-provider failure
//! - [`types`] module — the beacon domain values exchanged with providers

pub mod capability;
pub mod error;
pub mod provider;
pub mod types;

pub use capability::{Capability, CapabilitySet};
pub use error::{ProviderError, TypeError};
pub use provider::BeaconProvider;
pub use types::{
    AggregateAndProof, Attestation, AttestationData, BlockId, BlsPubKey, BlsSignature, Checkpoint,
    Epoch, Gwei, ProposerDuty, Root, SignedAggregateAndProof, Slot, StateId,
    SyncCommitteeContribution, ValidatorIndex,
};
