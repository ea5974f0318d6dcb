//! Beacon-chain domain values exchanged with providers.
//!
//! Values arrive here already decoded and validated by the transport layer;
//! the dispatch layer only needs them to be comparable.

use std::fmt;
use std::str::FromStr;

use crate::error::TypeError;

macro_rules! uint_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(v: u64) -> Self {
                Self(v)
            }
        }
    };
}

uint_newtype!(
    /// Slot number.
    Slot
);
uint_newtype!(
    /// Epoch number.
    Epoch
);
uint_newtype!(
    /// Index of a validator in the beacon state registry.
    ValidatorIndex
);
uint_newtype!(
    /// Balance amount in gwei.
    Gwei
);

macro_rules! fixed_bytes {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self([0u8; $len])
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl FromStr for $name {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = hex::decode(s.trim_start_matches("0x"))
                    .map_err(|e| TypeError::Hex(e.to_string()))?;
                let bytes: [u8; $len] = raw
                    .as_slice()
                    .try_into()
                    .map_err(|_| TypeError::Length { expected: $len, actual: raw.len() })?;
                Ok(Self(bytes))
            }
        }
    };
}

fixed_bytes!(
    /// 32-byte SSZ hash tree root.
    Root,
    32
);
fixed_bytes!(
    /// BLS12-381 public key.
    BlsPubKey,
    48
);
fixed_bytes!(
    /// BLS12-381 signature.
    BlsSignature,
    96
);

/// Identifies a beacon state: `head`, `genesis`, `finalized`, `justified`,
/// a slot number, or a state root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateId {
    Head,
    Genesis,
    Finalized,
    Justified,
    Slot(Slot),
    Root(Root),
}

/// Identifies a beacon block: same forms as [`StateId`] except `justified`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockId {
    Head,
    Genesis,
    Finalized,
    Slot(Slot),
    Root(Root),
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Head => write!(f, "head"),
            Self::Genesis => write!(f, "genesis"),
            Self::Finalized => write!(f, "finalized"),
            Self::Justified => write!(f, "justified"),
            Self::Slot(slot) => write!(f, "{slot}"),
            Self::Root(root) => write!(f, "{root}"),
        }
    }
}

impl FromStr for StateId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "head" => Ok(Self::Head),
            "genesis" => Ok(Self::Genesis),
            "finalized" => Ok(Self::Finalized),
            "justified" => Ok(Self::Justified),
            _ => match parse_slot_or_root(s)? {
                SlotOrRoot::Slot(slot) => Ok(Self::Slot(slot)),
                SlotOrRoot::Root(root) => Ok(Self::Root(root)),
            },
        }
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Head => write!(f, "head"),
            Self::Genesis => write!(f, "genesis"),
            Self::Finalized => write!(f, "finalized"),
            Self::Slot(slot) => write!(f, "{slot}"),
            Self::Root(root) => write!(f, "{root}"),
        }
    }
}

impl FromStr for BlockId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "head" => Ok(Self::Head),
            "genesis" => Ok(Self::Genesis),
            "finalized" => Ok(Self::Finalized),
            _ => match parse_slot_or_root(s)? {
                SlotOrRoot::Slot(slot) => Ok(Self::Slot(slot)),
                SlotOrRoot::Root(root) => Ok(Self::Root(root)),
            },
        }
    }
}

enum SlotOrRoot {
    Slot(Slot),
    Root(Root),
}

fn parse_slot_or_root(s: &str) -> Result<SlotOrRoot, TypeError> {
    if s.starts_with("0x") {
        return s.parse().map(SlotOrRoot::Root);
    }
    s.parse::<u64>()
        .map(|n| SlotOrRoot::Slot(Slot(n)))
        .map_err(|_| TypeError::InvalidId(s.to_string()))
}

/// A validator's duty to propose the block at `slot`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProposerDuty {
    pub pubkey: BlsPubKey,
    pub validator_index: ValidatorIndex,
    pub slot: Slot,
}

/// Aggregated sync-committee signature over a block root for one subcommittee.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyncCommitteeContribution {
    pub slot: Slot,
    pub beacon_block_root: Root,
    pub subcommittee_index: u64,
    pub aggregation_bits: Vec<u8>,
    pub signature: BlsSignature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Checkpoint {
    pub epoch: Epoch,
    pub root: Root,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AttestationData {
    pub slot: Slot,
    pub index: u64,
    pub beacon_block_root: Root,
    pub source: Checkpoint,
    pub target: Checkpoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attestation {
    pub aggregation_bits: Vec<u8>,
    pub data: AttestationData,
    pub signature: BlsSignature,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AggregateAndProof {
    pub aggregator_index: ValidatorIndex,
    pub aggregate: Attestation,
    pub selection_proof: BlsSignature,
}

/// An aggregate attestation signed by its aggregator, ready for submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignedAggregateAndProof {
    pub message: AggregateAndProof,
    pub signature: BlsSignature,
}
