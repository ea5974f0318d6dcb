use beaconrpc_core::{Capability, Root, StateId};

use crate::{CallContext, MultiClient, MultiError};

impl MultiClient {
    pub async fn beacon_state_root(
        &self,
        ctx: &CallContext,
        state: &StateId,
    ) -> Result<Option<Root>, MultiError> {
        let state = *state;
        self.call(ctx, Capability::BeaconStateRoot, move |provider| {
            Box::pin(async move { provider.beacon_state_root(&state).await })
        })
        .await
    }
}
