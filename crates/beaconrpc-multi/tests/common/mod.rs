//! Shared test helpers: a scriptable in-memory beacon node.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use beaconrpc_multi::{
    try_init_tracing, BeaconProvider, BlockId, Capability, CapabilitySet, Epoch, Gwei, LogConfig,
    ProposerDuty, ProviderError, Root, SignedAggregateAndProof, Slot, StateId,
    SyncCommitteeContribution, ValidatorIndex,
};

/// Install a test subscriber once per test binary.
pub fn init_logging() {
    let _ = try_init_tracing(&LogConfig::default());
}

/// How the node answers its next calls.
#[derive(Debug, Clone)]
pub enum Behaviour {
    Answer,
    Fail(ProviderError),
    /// Never answer.
    Hang,
}

/// Beacon node double with a fixed data set, a response delay and
/// counters for calls and abandoned (dropped mid-flight) calls.
pub struct MockNode {
    name: String,
    capabilities: CapabilitySet,
    delay: Duration,
    behaviour: Mutex<Behaviour>,
    root: Option<Root>,
    balances: Option<BTreeMap<ValidatorIndex, Gwei>>,
    duties: Option<Vec<ProposerDuty>>,
    calls: AtomicUsize,
    abandoned: AtomicUsize,
    submitted: AtomicUsize,
}

impl MockNode {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            capabilities: CapabilitySet::all(),
            delay: Duration::ZERO,
            behaviour: Mutex::new(Behaviour::Answer),
            root: None,
            balances: None,
            duties: None,
            calls: AtomicUsize::new(0),
            abandoned: AtomicUsize::new(0),
            submitted: AtomicUsize::new(0),
        }
    }

    pub fn delay_ms(mut self, ms: u64) -> Self {
        self.delay = Duration::from_millis(ms);
        self
    }

    pub fn capabilities(mut self, capabilities: CapabilitySet) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn root(mut self, byte: u8) -> Self {
        self.root = Some(Root([byte; 32]));
        self
    }

    pub fn balances(mut self, balances: &[(u64, u64)]) -> Self {
        self.balances = Some(
            balances
                .iter()
                .map(|&(index, gwei)| (ValidatorIndex(index), Gwei(gwei)))
                .collect(),
        );
        self
    }

    pub fn duties(mut self, duties: Vec<ProposerDuty>) -> Self {
        self.duties = Some(duties);
        self
    }

    pub fn failing(self, error: ProviderError) -> Self {
        self.set(Behaviour::Fail(error));
        self
    }

    pub fn hanging(self) -> Self {
        self.set(Behaviour::Hang);
        self
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn set(&self, behaviour: Behaviour) {
        *self.behaviour.lock().unwrap() = behaviour;
    }

    /// Calls started, including abandoned ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls dropped before they produced an answer.
    pub fn abandoned(&self) -> usize {
        self.abandoned.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::SeqCst)
    }

    async fn respond<T: Clone>(&self, value: &T) -> Result<T, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let behaviour = self.behaviour.lock().unwrap().clone();
        let mut flight = InFlight {
            node: self,
            finished: false,
        };
        tokio::time::sleep(self.delay).await;
        let result = match behaviour {
            Behaviour::Answer => Ok(value.clone()),
            Behaviour::Fail(err) => Err(err),
            Behaviour::Hang => std::future::pending().await,
        };
        flight.finished = true;
        result
    }
}

struct InFlight<'a> {
    node: &'a MockNode,
    finished: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.node.abandoned.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl BeaconProvider for MockNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    async fn proposer_duties(
        &self,
        _epoch: Epoch,
        indices: &[ValidatorIndex],
    ) -> Result<Option<Vec<ProposerDuty>>, ProviderError> {
        let duties = self.respond(&self.duties).await?;
        Ok(duties.map(|duties| {
            duties
                .into_iter()
                .filter(|d| indices.is_empty() || indices.contains(&d.validator_index))
                .collect()
        }))
    }

    async fn validator_balances(
        &self,
        _state: &StateId,
        indices: &[ValidatorIndex],
    ) -> Result<Option<BTreeMap<ValidatorIndex, Gwei>>, ProviderError> {
        let balances = self.respond(&self.balances).await?;
        Ok(balances.map(|mut balances| {
            if !indices.is_empty() {
                balances.retain(|index, _| indices.contains(index));
            }
            balances
        }))
    }

    async fn sync_committee_contribution(
        &self,
        _slot: Slot,
        _subcommittee_index: u64,
        _beacon_block_root: Root,
    ) -> Result<Option<SyncCommitteeContribution>, ProviderError> {
        self.respond(&None).await
    }

    async fn beacon_block_root(&self, _block: &BlockId) -> Result<Option<Root>, ProviderError> {
        self.respond(&self.root).await
    }

    async fn beacon_state_root(&self, _state: &StateId) -> Result<Option<Root>, ProviderError> {
        self.respond(&self.root).await
    }

    async fn submit_aggregate_attestations(
        &self,
        aggregates: &[SignedAggregateAndProof],
    ) -> Result<(), ProviderError> {
        self.respond(&()).await?;
        self.submitted.fetch_add(aggregates.len(), Ordering::SeqCst);
        Ok(())
    }
}

/// Capability set containing only `capability`.
pub fn only(capability: Capability) -> CapabilitySet {
    CapabilitySet::empty().with(capability)
}
