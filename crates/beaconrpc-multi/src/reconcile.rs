//! Reconciliation — turning several providers' answers into one.
//!
//! A reconciler sees the successful responses of one dispatch, ordered by
//! provider registration order, and either picks the final value or reports
//! a [`ConsensusMismatch`]. Responses are compared with `PartialEq`, so a
//! "no data" answer (`None`) votes like any other value.

use std::fmt::Debug;

use beaconrpc_core::ProviderError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::FailureReport;
use crate::registry::ProviderId;

/// Policy turning the successful responses of a dispatch into one value.
pub trait Reconciler<V>: Send + Sync {
    fn reconcile(&self, responses: Vec<(ProviderId, V)>) -> Result<V, ConsensusMismatch>;
}

/// Built-in reconciliation policies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Race all providers and take the first success. The dispatcher handles
    /// this inline; as a post-hoc policy it takes the first response.
    #[default]
    FirstSuccess,
    /// Every successful response must be equal.
    Unanimous,
    /// More than half of the successful responses must be equal.
    Majority,
    /// At least `n` responses must be equal.
    Quorum(usize),
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FirstSuccess => write!(f, "first_success"),
            Self::Unanimous => write!(f, "unanimous"),
            Self::Majority => write!(f, "majority"),
            Self::Quorum(n) => write!(f, "quorum({n})"),
        }
    }
}

/// Reconciliation failed: not enough providers agreed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "consensus mismatch under {strategy}: {agreeing} of {responses} responses agree, {required} required; divergent: {divergent}"
)]
pub struct ConsensusMismatch {
    pub strategy: Strategy,
    /// Size of the largest group of equal responses.
    pub agreeing: usize,
    /// Group size the strategy needed.
    pub required: usize,
    /// Number of successful responses considered.
    pub responses: usize,
    /// Providers whose value differs from the plurality, with their value.
    pub divergent: FailureReport,
}

struct Group<V> {
    value: V,
    members: Vec<ProviderId>,
}

/// Group equal responses, preserving first-seen order.
fn group<V: PartialEq>(responses: Vec<(ProviderId, V)>) -> Vec<Group<V>> {
    let mut groups: Vec<Group<V>> = Vec::new();
    for (id, value) in responses {
        match groups.iter_mut().find(|g| g.value == value) {
            Some(existing) => existing.members.push(id),
            None => groups.push(Group {
                value,
                members: vec![id],
            }),
        }
    }
    groups
}

/// Index of the largest group; ties go to the group seen first.
fn plurality<V>(groups: &[Group<V>]) -> usize {
    let mut best = 0;
    for (i, g) in groups.iter().enumerate() {
        if g.members.len() > groups[best].members.len() {
            best = i;
        }
    }
    best
}

impl<V> Reconciler<V> for Strategy
where
    V: PartialEq + Debug,
{
    fn reconcile(&self, responses: Vec<(ProviderId, V)>) -> Result<V, ConsensusMismatch> {
        let total = responses.len();
        let required = match *self {
            Self::FirstSuccess => 1,
            Self::Unanimous => total.max(1),
            Self::Majority => total / 2 + 1,
            Self::Quorum(n) => n.max(1),
        };

        if *self == Self::FirstSuccess {
            if let Some((_, value)) = responses.into_iter().next() {
                return Ok(value);
            }
            return Err(ConsensusMismatch {
                strategy: *self,
                agreeing: 0,
                required,
                responses: 0,
                divergent: FailureReport::new(),
            });
        }

        let mut groups = group(responses);
        if groups.is_empty() {
            return Err(ConsensusMismatch {
                strategy: *self,
                agreeing: 0,
                required,
                responses: 0,
                divergent: FailureReport::new(),
            });
        }

        let winner = plurality(&groups);
        let agreeing = groups[winner].members.len();
        if agreeing >= required {
            return Ok(groups.swap_remove(winner).value);
        }

        let mut divergent = FailureReport::new();
        for (i, g) in groups.iter().enumerate() {
            if i == winner {
                continue;
            }
            let value = format!("{:?}", g.value);
            for id in &g.members {
                divergent.push(id.clone(), ProviderError::Divergent { value: value.clone() });
            }
        }
        tracing::warn!(
            strategy = %self,
            agreeing,
            required,
            responses = total,
            "providers disagree"
        );
        Err(ConsensusMismatch {
            strategy: *self,
            agreeing,
            required,
            responses: total,
            divergent,
        })
    }
}
