//! Governor Oracle Port - Raw Governance Contract Reads
//!
//! The transport-level view of an external governor: raw state index,
//! raw voting-end value and chain height. Dialect interpretation lives
//! in the outcome adapter, not here.

use async_trait::async_trait;

use crate::domain::types::{AccountId, NativeProposalId};

/// Trait for reading proposal data from a governor contract.
#[async_trait]
pub trait GovernorOracle: Send + Sync + 'static {
  /// Raw `state(uint256)` value, or `None` if the governor does not know the id.
  async fn state_index(&self, native_id: NativeProposalId) -> anyhow::Result<Option<u8>>;

  /// Raw voting-end value (block height or timestamp, per governor clock).
  async fn voting_end(&self, native_id: NativeProposalId) -> anyhow::Result<u64>;

  /// Latest block height of the governor's chain.
  async fn block_number(&self) -> anyhow::Result<u64>;

  /// Address of the governor contract.
  fn governor_address(&self) -> AccountId;
}
