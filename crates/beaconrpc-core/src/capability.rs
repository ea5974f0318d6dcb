//! Capability model — the logical operations a provider can serve.
//!
//! Capabilities are declared once, when a provider is registered, and never
//! re-derived per call.

use serde::{Deserialize, Serialize};

/// One logical beacon API operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ProposerDuties,
    ValidatorBalances,
    SyncCommitteeContribution,
    BeaconBlockRoot,
    BeaconStateRoot,
    SubmitAggregateAttestations,
}

impl Capability {
    /// Every known capability, in declaration order.
    pub const ALL: [Capability; 6] = [
        Self::ProposerDuties,
        Self::ValidatorBalances,
        Self::SyncCommitteeContribution,
        Self::BeaconBlockRoot,
        Self::BeaconStateRoot,
        Self::SubmitAggregateAttestations,
    ];

    /// Stable snake_case name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProposerDuties => "proposer_duties",
            Self::ValidatorBalances => "validator_balances",
            Self::SyncCommitteeContribution => "sync_committee_contribution",
            Self::BeaconBlockRoot => "beacon_block_root",
            Self::BeaconStateRoot => "beacon_state_root",
            Self::SubmitAggregateAttestations => "submit_aggregate_attestations",
        }
    }

    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fixed set of capabilities.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CapabilitySet(u32);

impl CapabilitySet {
    /// The empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Every known capability.
    pub fn all() -> Self {
        Capability::ALL.into_iter().collect()
    }

    /// Returns a copy of this set with `cap` added.
    pub fn with(mut self, cap: Capability) -> Self {
        self.insert(cap);
        self
    }

    pub fn insert(&mut self, cap: Capability) {
        self.0 |= cap.bit();
    }

    pub fn contains(&self, cap: Capability) -> bool {
        self.0 & cap.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if every capability in `other` is also in `self`.
    pub fn is_superset(&self, other: &CapabilitySet) -> bool {
        self.0 & other.0 == other.0
    }

    /// Capabilities present in both sets.
    pub fn intersection(&self, other: &CapabilitySet) -> CapabilitySet {
        Self(self.0 & other.0)
    }

    /// Iterate the members in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL.into_iter().filter(|c| self.contains(*c))
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        let mut set = Self::empty();
        for cap in iter {
            set.insert(cap);
        }
        set
    }
}

impl std::fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
