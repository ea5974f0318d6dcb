use std::sync::Arc;

use beaconrpc_core::{Capability, Epoch, ProposerDuty, ValidatorIndex};

use crate::{CallContext, MultiClient, MultiError};

impl MultiClient {
    /// Proposer duties for `epoch`.
    ///
    /// An empty `indices` returns every duty; otherwise only duties of the
    /// listed validators. `None` means no provider had data for the epoch.
    pub async fn proposer_duties(
        &self,
        ctx: &CallContext,
        epoch: Epoch,
        indices: &[ValidatorIndex],
    ) -> Result<Option<Vec<ProposerDuty>>, MultiError> {
        let indices: Arc<[ValidatorIndex]> = indices.into();
        self.call(ctx, Capability::ProposerDuties, move |provider| {
            let indices = Arc::clone(&indices);
            Box::pin(async move { provider.proposer_duties(epoch, &indices).await })
        })
        .await
    }
}
