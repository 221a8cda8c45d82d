//! Core venue types.
//!
//! Identifiers, the canonical outcome vocabulary, bet sides, and the
//! capability set an outcome adapter must advertise. These types are the
//! foundation of the hexagonal architecture's inner ring.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────
// Type aliases consumed by ports and adapters
// ────────────────────────────────────────────

/// Internal proposal identifier, assigned monotonically from 1.
pub type ProposalId = u64;

/// Identifier of a proposal inside the external governance system.
pub type NativeProposalId = U256;

/// A participant, resolver, house receiver or custodian account.
pub type AccountId = Address;

/// A fungible asset (token contract address).
pub type AssetId = Address;

/// Registry key of an outcome adapter.
pub type AdapterId = Address;

/// Asset amount in atomic units.
pub type Amount = u128;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Basis points (1/100 of a percent).
pub type Bps = u16;

// ────────────────────────────────────────────
// Outcome vocabulary
// ────────────────────────────────────────────

/// The venue's own outcome vocabulary every governance dialect collapses into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalOutcome {
    /// Voting still open (or not yet started).
    #[default]
    Unresolved,
    /// The proposal passed.
    Succeeded,
    /// The proposal failed.
    Defeated,
    /// The proposal was withdrawn or vetoed; all stakes are refunded.
    Cancelled,
}

impl CanonicalOutcome {
    /// Whether this outcome is terminal.
    pub fn is_final(self) -> bool {
        !matches!(self, Self::Unresolved)
    }

    /// The bet side that wins under this outcome, if any.
    pub fn winning_side(self) -> Option<BetSide> {
        match self {
            Self::Succeeded => Some(BetSide::Succeed),
            Self::Defeated => Some(BetSide::Defeat),
            Self::Unresolved | Self::Cancelled => None,
        }
    }
}

impl std::fmt::Display for CanonicalOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unresolved => write!(f, "UNRESOLVED"),
            Self::Succeeded => write!(f, "SUCCEEDED"),
            Self::Defeated => write!(f, "DEFEATED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Which outcome arm a stake backs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetSide {
    /// Backs the proposal passing.
    Succeed,
    /// Backs the proposal failing.
    Defeat,
}

impl BetSide {
    /// The opposing arm.
    pub fn opposite(self) -> Self {
        match self {
            Self::Succeed => Self::Defeat,
            Self::Defeat => Self::Succeed,
        }
    }
}

impl std::fmt::Display for BetSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Succeed => write!(f, "SUCCEED"),
            Self::Defeat => write!(f, "DEFEAT"),
        }
    }
}

// ────────────────────────────────────────────
// Adapter capability introspection
// ────────────────────────────────────────────

/// Bit-set of the queries an outcome adapter answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Capabilities(u8);

impl Capabilities {
    pub const IDENTIFY_DAO: Self = Self(1 << 0);
    pub const MAP_PROPOSAL: Self = Self(1 << 1);
    pub const REPORT_OUTCOME: Self = Self(1 << 2);
    pub const REPORT_DEADLINE: Self = Self(1 << 3);
    pub const REPORT_REGISTRATION: Self = Self(1 << 4);
    pub const REPORT_EXTERNAL_ACTIVITY: Self = Self(1 << 5);

    /// The full set required for registry admission.
    pub const OUTCOME_ADAPTER: Self = Self(0b0011_1111);

    /// No capabilities.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Union of two sets.
    #[must_use]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Whether every capability in `other` is present.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether this set satisfies the outcome adapter interface.
    pub const fn is_outcome_adapter(self) -> bool {
        self.contains(Self::OUTCOME_ADAPTER)
    }
}
