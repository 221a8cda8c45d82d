//! Asset Custody Port - Fungible Asset Transfers
//!
//! Standard fungible-asset custody semantics, bound to the venue's own
//! account: `transfer` and `approve` act as the venue, `transfer_from`
//! spends a prior allowance. Every call may fail and the failure aborts
//! the enclosing engine operation.

use async_trait::async_trait;

use crate::domain::types::{AccountId, Amount, AssetId};

/// Trait for custodial asset movements.
#[async_trait]
pub trait AssetCustody: Send + Sync + 'static {
  /// The account this custody handle acts as.
  fn holder(&self) -> AccountId;

  /// Move `amount` of `asset` from the holder to `to`.
  async fn transfer(&self, asset: AssetId, to: AccountId, amount: Amount) -> anyhow::Result<()>;

  /// Move `amount` of `asset` from `from` to `to` using the holder's allowance.
  async fn transfer_from(
    &self,
    asset: AssetId,
    from: AccountId,
    to: AccountId,
    amount: Amount,
  ) -> anyhow::Result<()>;

  /// Allow `spender` to move up to `amount` of the holder's `asset`.
  async fn approve(&self, asset: AssetId, spender: AccountId, amount: Amount) -> anyhow::Result<()>;

  /// Balance of `holder` in `asset`.
  async fn balance_of(&self, asset: AssetId, holder: AccountId) -> anyhow::Result<Amount>;

  /// Pay several recipients from the holder; all legs commit or none do.
  async fn transfer_batch(&self, asset: AssetId, legs: &[(AccountId, Amount)]) -> anyhow::Result<()>;
}
