//! Asset Exchange Port - Constant-Product Pair Access
//!
//! Pair lookup with reserves ordered for a swap direction, and exact-input
//! swap execution with a minimum output and an absolute deadline.

use async_trait::async_trait;

use crate::domain::amm::PairReserves;
use crate::domain::types::{AccountId, Amount, AssetId, Timestamp};

/// Parameters of an exact-input swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapRequest {
  /// Asset sold.
  pub asset_in: AssetId,
  /// Asset bought.
  pub asset_out: AssetId,
  /// Exact amount sold.
  pub amount_in: Amount,
  /// Swap fails if it would return less.
  pub min_out: Amount,
  /// Swap fails if executed after this unix time.
  pub deadline: Timestamp,
  /// Account the input is pulled from (must have approved the exchange).
  pub payer: AccountId,
  /// Account credited with the output.
  pub recipient: AccountId,
}

/// Trait for the automated market maker the venue converts through.
#[async_trait]
pub trait AssetExchange: Send + Sync + 'static {
  /// Account that pulls input funds (the approval spender).
  fn spender(&self) -> AccountId;

  /// Reserves for selling `asset_in` into `asset_out`, or `None` if no pair exists.
  async fn pair_reserves(
    &self,
    asset_in: AssetId,
    asset_out: AssetId,
  ) -> anyhow::Result<Option<PairReserves>>;

  /// Execute the swap and return the amount received.
  async fn swap_exact_in(&self, request: SwapRequest) -> anyhow::Result<Amount>;
}
