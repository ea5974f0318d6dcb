use beaconrpc_core::{BlockId, Capability, Root};

use crate::{CallContext, MultiClient, MultiError};

impl MultiClient {
    /// Root of the block identified by `block`.
    ///
    /// Returns `Ok(None)` when the block is not available, which is not an error.
    pub async fn beacon_block_root(
        &self,
        ctx: &CallContext,
        block: &BlockId,
    ) -> Result<Option<Root>, MultiError> {
        let block = *block;
        self.call(ctx, Capability::BeaconBlockRoot, move |provider| {
            Box::pin(async move { provider.beacon_block_root(&block).await })
        })
        .await
    }
}
