//! Governance dialects and their outcome-mapping tables.
//!
//! Each external governance system enumerates proposal states its own way.
//! A dialect decodes the raw state index reported by the governor contract
//! and collapses it into a [`CanonicalOutcome`]. States without a table
//! entry are a fatal mapping failure, never a guess.

use serde::{Deserialize, Serialize};

use super::error::{Result, VenueError};
use super::types::CanonicalOutcome;

/// Union of every native proposal state known across dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NativeState {
    Pending,
    Active,
    Canceled,
    Defeated,
    Succeeded,
    Queued,
    Expired,
    Executed,
    Vetoed,
    ObjectionPeriod,
    Updatable,
}

use NativeState::{
    Active, Canceled, Defeated, Executed, Expired, ObjectionPeriod, Pending, Queued, Succeeded,
    Updatable, Vetoed,
};

/// GovernorBravo `ProposalState` in declaration order.
const BRAVO_STATES: &[NativeState] = &[
    Pending, Active, Canceled, Defeated, Succeeded, Queued, Expired, Executed,
];

/// OpenZeppelin `IGovernor.ProposalState` in declaration order.
const OZ_GOVERNOR_STATES: &[NativeState] = &[
    Pending, Active, Canceled, Defeated, Succeeded, Queued, Expired, Executed,
];

/// Nouns-style governor with veto, objection period and updatable states.
const OBJECTION_STATES: &[NativeState] = &[
    Pending,
    Active,
    Canceled,
    Defeated,
    Succeeded,
    Queued,
    Expired,
    Executed,
    Vetoed,
    ObjectionPeriod,
    Updatable,
];

/// Unit in which a governor reports its voting deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineUnit {
    /// Block height; converted to wall-clock with the configured block time.
    #[default]
    Block,
    /// Unix timestamp (OZ governors in timestamp clock mode).
    Timestamp,
}

/// Governance dialects the venue can settle against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GovernanceDialect {
    /// Compound GovernorBravo and forks.
    Bravo,
    /// OpenZeppelin Governor.
    OzGovernor,
    /// Governors with an objection period and a vetoer (Nouns-style).
    Objection,
}

impl GovernanceDialect {
    /// The dialect's native enumeration, indexed by the on-chain value.
    pub fn states(self) -> &'static [NativeState] {
        match self {
            Self::Bravo => BRAVO_STATES,
            Self::OzGovernor => OZ_GOVERNOR_STATES,
            Self::Objection => OBJECTION_STATES,
        }
    }

    /// Decode the raw `state(uint256)` return value.
    pub fn decode(self, index: u8) -> Result<NativeState> {
        self.states().get(usize::from(index)).copied().ok_or_else(|| {
            VenueError::OracleMapping(format!("{self} governor reported unknown state index {index}"))
        })
    }

    /// Collapse a native state into the canonical vocabulary.
    pub fn canonical(self, state: NativeState) -> Result<CanonicalOutcome> {
        if !self.states().contains(&state) {
            return Err(VenueError::OracleMapping(format!(
                "{state:?} is not a {self} state"
            )));
        }
        match state {
            Pending | Active | ObjectionPeriod => Ok(CanonicalOutcome::Unresolved),
            Succeeded | Queued | Executed => Ok(CanonicalOutcome::Succeeded),
            Defeated | Expired => Ok(CanonicalOutcome::Defeated),
            Canceled | Vetoed => Ok(CanonicalOutcome::Cancelled),
            Updatable => Err(VenueError::OracleMapping(format!(
                "{self} proposal is in pre-voting state {state:?}"
            ))),
        }
    }

    /// Decode and collapse in one step.
    pub fn outcome_of_index(self, index: u8) -> Result<CanonicalOutcome> {
        self.canonical(self.decode(index)?)
    }

    /// Whether a native state accepts admission (voting is live).
    pub fn is_live(self, state: NativeState) -> bool {
        match state {
            Active => true,
            ObjectionPeriod => self == Self::Objection,
            _ => false,
        }
    }

    /// Default deadline getter: Solidity signature and return word index.
    pub fn default_deadline_call(self) -> (&'static str, usize) {
        match self {
            // proposals(id) -> (id, proposer, eta, startBlock, endBlock, ...)
            Self::Bravo => ("proposals(uint256)", 4),
            Self::OzGovernor => ("proposalDeadline(uint256)", 0),
            // proposals(id) -> (id, proposer, threshold, quorum, eta, startBlock, endBlock, ...)
            Self::Objection => ("proposals(uint256)", 6),
        }
    }
}

impl std::fmt::Display for GovernanceDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bravo => write!(f, "bravo"),
            Self::OzGovernor => write!(f, "oz_governor"),
            Self::Objection => write!(f, "objection"),
        }
    }
}
