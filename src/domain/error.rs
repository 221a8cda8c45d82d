//! Venue error taxonomy.
//!
//! Every engine operation fails with exactly one of these classes.
//! `OracleMapping` and `Consistency` are fatal: they signal a broken
//! invariant and must never be swallowed.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VenueError {
    /// Malformed input: null reference, non-positive amount, out-of-bound rate.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Unregistered proposal, DAO, asset or mapping.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation attempted in the wrong lifecycle phase.
    #[error("Invalid state: {0}")]
    State(String),

    /// Exchange pool missing, depleted, or swap bounds not met.
    #[error("Insufficient liquidity: {0}")]
    Liquidity(String),

    /// The adapter could not classify a native governance state.
    #[error("Oracle mapping failure: {0}")]
    OracleMapping(String),

    /// Ledger corruption detected.
    #[error("Ledger inconsistency: {0}")]
    Consistency(String),

    /// Caller lacks the role required by an administrative operation.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The external governance system could not be reached.
    #[error("Oracle unavailable: {0}")]
    Oracle(String),

    /// Custody refused a transfer, approval or balance query; recoverable.
    #[error("Custody transfer failed: {0}")]
    Custody(String),
}

impl VenueError {
    /// Fatal classes abort the operation and indicate an invariant breach.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::OracleMapping(_) | Self::Consistency(_))
    }

    /// Short class label used in logs and metrics.
    pub fn class(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::State(_) => "state",
            Self::Liquidity(_) => "liquidity",
            Self::OracleMapping(_) => "oracle_mapping",
            Self::Consistency(_) => "consistency",
            Self::Unauthorized(_) => "unauthorized",
            Self::Oracle(_) => "oracle",
            Self::Custody(_) => "custody",
        }
    }
}

pub type Result<T> = std::result::Result<T, VenueError>;
