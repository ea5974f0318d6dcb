use std::collections::BTreeMap;
use std::sync::Arc;

use beaconrpc_core::{Capability, Gwei, StateId, ValidatorIndex};

use crate::{CallContext, MultiClient, MultiError};

impl MultiClient {
    /// Validator balances at `state`.
    ///
    /// An empty `indices` applies no filter.
    pub async fn validator_balances(
        &self,
        ctx: &CallContext,
        state: &StateId,
        indices: &[ValidatorIndex],
    ) -> Result<Option<BTreeMap<ValidatorIndex, Gwei>>, MultiError> {
        let state = *state;
        let indices: Arc<[ValidatorIndex]> = indices.into();
        self.call(ctx, Capability::ValidatorBalances, move |provider| {
            let indices = Arc::clone(&indices);
            Box::pin(async move { provider.validator_balances(&state, &indices).await })
        })
        .await
    }
}
