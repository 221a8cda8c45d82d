//! Domain layer - Core business logic and models.
//!
//! This module contains the pure settlement logic for the venue: outcome
//! vocabulary, governance dialect tables, pari-mutuel arithmetic, the
//! proposal/bet ledger and the registry. No I/O here (hexagonal
//! architecture inner ring). All types are testable in isolation.

pub mod amm;
pub mod dialect;
pub mod error;
pub mod events;
pub mod ledger;
pub mod payout;
pub mod registry;
pub mod types;

// Re-export core types for convenience
pub use dialect::{DeadlineUnit, GovernanceDialect, NativeState};
pub use error::{Result, VenueError};
pub use events::{ProposalView, VenueEvent};
pub use ledger::{Bet, Ledger, LedgerSnapshot, Proposal};
pub use payout::Commissions;
pub use registry::{Registry, RegistrySnapshot};
pub use types::{
    AccountId, AdapterId, Amount, AssetId, BetSide, Bps, CanonicalOutcome, Capabilities,
    NativeProposalId, ProposalId, Timestamp,
};
