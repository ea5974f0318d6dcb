use beaconrpc_core::{Capability, Root, Slot, SyncCommitteeContribution};

use crate::{CallContext, MultiClient, MultiError};

impl MultiClient {
    /// Sync-committee contribution for `slot`, `subcommittee_index` and
    /// `beacon_block_root`.
    pub async fn sync_committee_contribution(
        &self,
        ctx: &CallContext,
        slot: Slot,
        subcommittee_index: u64,
        beacon_block_root: Root,
    ) -> Result<Option<SyncCommitteeContribution>, MultiError> {
        self.call(ctx, Capability::SyncCommitteeContribution, move |provider| {
            Box::pin(async move {
                provider
                    .sync_committee_contribution(slot, subcommittee_index, beacon_block_root)
                    .await
            })
        })
        .await
    }
}
