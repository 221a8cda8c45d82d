//! Outcome Adapter Port - Governance Oracle Normalization
//!
//! One implementation per external governance dialect. The adapter binds
//! internal proposal ids to native ids and reports the canonical outcome
//! and voting deadline of a bound proposal.

use async_trait::async_trait;

use crate::domain::error::Result;
use crate::domain::types::{
  AccountId, AdapterId, Capabilities, CanonicalOutcome, NativeProposalId, ProposalId, Timestamp,
};

/// Binding between an internal id and the governor's native id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProposalMapping {
  /// Whether the binding exists.
  pub registered: bool,
  /// Native proposal id inside the external governor.
  pub native_id: NativeProposalId,
}

/// Trait for governance outcome adapters.
///
/// Implementors never guess: a native state outside the dialect table
/// is reported as `VenueError::OracleMapping`.
#[async_trait]
pub trait OutcomeAdapter: Send + Sync + 'static {
  /// Registry key of this adapter.
  fn adapter_id(&self) -> AdapterId;

  /// Human-readable DAO name.
  fn dao_name(&self) -> String;

  /// Address of the external governor contract.
  fn dao_address(&self) -> AccountId;

  /// Capability introspection consulted at registry admission.
  fn capabilities(&self) -> Capabilities;

  /// Bind a native id to an internal id. Rebinding the same pair is a no-op.
  async fn map_proposal(&self, native_id: NativeProposalId, proposal_id: ProposalId) -> Result<bool>;

  /// Current canonical outcome of a bound proposal.
  ///
  /// # Errors
  /// `NotFound` if unbound, `OracleMapping` if the native state is unmapped.
  async fn outcome_of(&self, proposal_id: ProposalId) -> Result<CanonicalOutcome>;

  /// Wall-clock voting deadline (unix seconds) of a bound proposal.
  async fn deadline_of(&self, proposal_id: ProposalId) -> Result<Timestamp>;

  /// Whether an internal id has been bound.
  async fn is_registered(&self, proposal_id: ProposalId) -> bool;

  /// Whether the native proposal exists and voting is live.
  async fn external_active_exists(&self, native_id: NativeProposalId) -> Result<bool>;
}
