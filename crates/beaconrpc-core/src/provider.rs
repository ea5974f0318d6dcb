//! The `BeaconProvider` trait — the boundary every backend client implements.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::capability::{Capability, CapabilitySet};
use crate::error::ProviderError;
use crate::types::{
    BlockId, Epoch, Gwei, ProposerDuty, Root, SignedAggregateAndProof, Slot, StateId,
    SyncCommitteeContribution, ValidatorIndex,
};

/// One backend beacon-node connection.
///
/// Every read operation has a three-way outcome:
/// - `Err(_)` — the call failed
/// - `Ok(None)` — the call succeeded but the node has no data for it
/// - `Ok(Some(_))` — the call succeeded with data
///
/// Implementations only override the operations listed in
/// [`capabilities`](Self::capabilities); the default bodies report
/// [`ProviderError::Unsupported`].
///
/// # Thread Safety
/// Implementations must be `Send + Sync` for use across Tokio tasks and are
/// stored as `Arc<dyn BeaconProvider>`.
///
/// # Cancellation
/// A call future may be dropped at any await point once the dispatch that
/// issued it no longer needs the answer.
#[async_trait]
pub trait BeaconProvider: Send + Sync + 'static {
    /// Stable identifier of this provider (usually its endpoint address).
    fn name(&self) -> &str;

    /// Operations this provider serves. Read once at registration.
    fn capabilities(&self) -> CapabilitySet;

    /// Proposer duties for `epoch`; an empty `indices` means all validators.
    async fn proposer_duties(
        &self,
        _epoch: Epoch,
        _indices: &[ValidatorIndex],
    ) -> Result<Option<Vec<ProposerDuty>>, ProviderError> {
        Err(ProviderError::Unsupported(Capability::ProposerDuties))
    }

    /// Balances at `state`; an empty `indices` means all validators.
    async fn validator_balances(
        &self,
        _state: &StateId,
        _indices: &[ValidatorIndex],
    ) -> Result<Option<BTreeMap<ValidatorIndex, Gwei>>, ProviderError> {
        Err(ProviderError::Unsupported(Capability::ValidatorBalances))
    }

    async fn sync_committee_contribution(
        &self,
        _slot: Slot,
        _subcommittee_index: u64,
        _beacon_block_root: Root,
    ) -> Result<Option<SyncCommitteeContribution>, ProviderError> {
        Err(ProviderError::Unsupported(Capability::SyncCommitteeContribution))
    }

    /// Root of the block identified by `block`, `None` if the node does not have it.
    async fn beacon_block_root(&self, _block: &BlockId) -> Result<Option<Root>, ProviderError> {
        Err(ProviderError::Unsupported(Capability::BeaconBlockRoot))
    }

    async fn beacon_state_root(&self, _state: &StateId) -> Result<Option<Root>, ProviderError> {
        Err(ProviderError::Unsupported(Capability::BeaconStateRoot))
    }

    async fn submit_aggregate_attestations(
        &self,
        _aggregates: &[SignedAggregateAndProof],
    ) -> Result<(), ProviderError> {
        Err(ProviderError::Unsupported(Capability::SubmitAggregateAttestations))
    }
}
