use std::sync::Arc;

use beaconrpc_core::{Capability, SignedAggregateAndProof};

use crate::{CallContext, MultiClient, MultiError, Strategy};

impl MultiClient {
    /// Submit aggregate attestations to every eligible provider.
    ///
    /// Submissions are broadcast rather than raced: the call waits for all
    /// providers (or the deadline) and succeeds if at least one accepted.
    /// The strategy override of `ctx` is ignored.
    pub async fn submit_aggregate_attestations(
        &self,
        ctx: &CallContext,
        aggregates: &[SignedAggregateAndProof],
    ) -> Result<(), MultiError> {
        let aggregates: Arc<[SignedAggregateAndProof]> = aggregates.into();
        self.call_with(
            ctx,
            Capability::SubmitAggregateAttestations,
            Strategy::Unanimous,
            move |provider| {
                let aggregates = Arc::clone(&aggregates);
                Box::pin(async move { provider.submit_aggregate_attestations(&aggregates).await })
            },
        )
        .await
    }
}
