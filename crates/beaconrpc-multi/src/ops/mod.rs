//! Operation wrappers — one per logical beacon API method.
//!
//! Each wrapper names the capability it needs, clones its arguments into a
//! per-provider call closure and hands that to the dispatcher. Fan-out,
//! health tracking and reconciliation all happen there; errors come back
//! unchanged so callers can branch on [`MultiError`](crate::MultiError).

mod beacon_block_root;
mod beacon_state_root;
mod proposer_duties;
mod submit_aggregate_attestations;
mod sync_committee_contribution;
mod validator_balances;
