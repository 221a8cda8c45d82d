//! In-Memory Custody - Fungible Asset Books
//!
//! `InMemoryBooks` is a shared balance and allowance ledger for every
//! asset and account in a simulation. `InMemoryCustody` acts on those
//! books as one holder (the venue), with standard token semantics:
//! `transfer` moves the holder's own funds, `transfer_from` spends an
//! allowance granted to the holder, and `transfer_batch` is all-or-none.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::domain::types::{AccountId, Amount, AssetId};
use crate::ports::custody::AssetCustody;

#[derive(Debug, Clone, Default)]
struct BooksState {
    balances: HashMap<(AssetId, AccountId), Amount>,
    /// (asset, owner, spender) -> remaining allowance
    allowances: HashMap<(AssetId, AccountId, AccountId), Amount>,
}

impl BooksState {
    fn balance(&self, asset: AssetId, holder: AccountId) -> Amount {
        self.balances.get(&(asset, holder)).copied().unwrap_or(0)
    }

    fn allowance(&self, asset: AssetId, owner: AccountId, spender: AccountId) -> Amount {
        self.allowances.get(&(asset, owner, spender)).copied().unwrap_or(0)
    }

    /// Move funds; validates before mutating.
    fn move_funds(&mut self, asset: AssetId, from: AccountId, to: AccountId, amount: Amount) -> Result<()> {
        let from_balance = self.balance(asset, from);
        anyhow::ensure!(
            from_balance >= amount,
            "{from} holds {from_balance} of {asset}, needs {amount}"
        );
        if from == to {
            return Ok(());
        }
        let to_balance = self
            .balance(asset, to)
            .checked_add(amount)
            .context("Balance overflow")?;
        self.balances.insert((asset, from), from_balance - amount);
        self.balances.insert((asset, to), to_balance);
        Ok(())
    }
}

/// Shared books for every asset in the system.
#[derive(Debug, Default)]
pub struct InMemoryBooks {
    state: Mutex<BooksState>,
}

/// Serializable books state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BooksSnapshot {
    pub balances: Vec<BalanceEntry>,
    pub allowances: Vec<AllowanceEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub asset: AssetId,
    pub holder: AccountId,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowanceEntry {
    pub asset: AssetId,
    pub owner: AccountId,
    pub spender: AccountId,
    pub amount: Amount,
}

impl InMemoryBooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit new units to an account.
    pub async fn mint(&self, asset: AssetId, to: AccountId, amount: Amount) -> Result<()> {
        let mut state = self.state.lock().await;
        let balance = state
            .balance(asset, to)
            .checked_add(amount)
            .context("Balance overflow")?;
        state.balances.insert((asset, to), balance);
        Ok(())
    }

    pub async fn balance(&self, asset: AssetId, holder: AccountId) -> Amount {
        self.state.lock().await.balance(asset, holder)
    }

    pub async fn allowance(&self, asset: AssetId, owner: AccountId, spender: AccountId) -> Amount {
        self.state.lock().await.allowance(asset, owner, spender)
    }

    /// `from` sends its own funds.
    pub async fn transfer(&self, asset: AssetId, from: AccountId, to: AccountId, amount: Amount) -> Result<()> {
        self.state.lock().await.move_funds(asset, from, to, amount)
    }

    /// `owner` lets `spender` move up to `amount`; replaces any prior allowance.
    pub async fn approve(&self, asset: AssetId, owner: AccountId, spender: AccountId, amount: Amount) {
        self.state
            .lock()
            .await
            .allowances
            .insert((asset, owner, spender), amount);
    }

    /// `spender` moves `from`'s funds within its allowance.
    pub async fn transfer_from(
        &self,
        asset: AssetId,
        spender: AccountId,
        from: AccountId,
        to: AccountId,
        amount: Amount,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        let allowance = state.allowance(asset, from, spender);
        anyhow::ensure!(
            allowance >= amount,
            "{spender} may spend {allowance} of {from}'s {asset}, needs {amount}"
        );
        state.move_funds(asset, from, to, amount)?;
        state
            .allowances
            .insert((asset, from, spender), allowance - amount);
        Ok(())
    }

    /// Several transfers from one account; either all apply or none.
    pub async fn transfer_batch(&self, asset: AssetId, from: AccountId, legs: &[(AccountId, Amount)]) -> Result<()> {
        let mut state = self.state.lock().await;
        let mut staged = state.clone();
        for (to, amount) in legs {
            staged.move_funds(asset, from, *to, *amount)?;
        }
        *state = staged;
        Ok(())
    }

    /// Swap-style exchange of two assets between two accounts, atomically.
    pub(crate) async fn exchange(
        &self,
        first: (AssetId, AccountId, AccountId, Amount),
        second: (AssetId, AccountId, AccountId, Amount),
        spender: AccountId,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        let mut staged = state.clone();
        let (asset, from, to, amount) = first;
        let allowance = staged.allowance(asset, from, spender);
        anyhow::ensure!(
            allowance >= amount,
            "{spender} may spend {allowance} of {from}'s {asset}, needs {amount}"
        );
        staged.move_funds(asset, from, to, amount)?;
        staged.allowances.insert((asset, from, spender), allowance - amount);
        let (asset, from, to, amount) = second;
        staged.move_funds(asset, from, to, amount)?;
        *state = staged;
        Ok(())
    }

    pub async fn snapshot(&self) -> BooksSnapshot {
        let state = self.state.lock().await;
        let mut balances: Vec<BalanceEntry> = state
            .balances
            .iter()
            .filter(|(_, amount)| **amount > 0)
            .map(|((asset, holder), amount)| BalanceEntry {
                asset: *asset,
                holder: *holder,
                amount: *amount,
            })
            .collect();
        balances.sort_by_key(|b| (b.asset, b.holder));
        let mut allowances: Vec<AllowanceEntry> = state
            .allowances
            .iter()
            .filter(|(_, amount)| **amount > 0)
            .map(|((asset, owner, spender), amount)| AllowanceEntry {
                asset: *asset,
                owner: *owner,
                spender: *spender,
                amount: *amount,
            })
            .collect();
        allowances.sort_by_key(|a| (a.asset, a.owner, a.spender));
        BooksSnapshot { balances, allowances }
    }

    pub async fn restore(&self, snapshot: BooksSnapshot) {
        let mut state = self.state.lock().await;
        state.balances = snapshot
            .balances
            .into_iter()
            .map(|b| ((b.asset, b.holder), b.amount))
            .collect();
        state.allowances = snapshot
            .allowances
            .into_iter()
            .map(|a| ((a.asset, a.owner, a.spender), a.amount))
            .collect();
    }
}

/// Custody port over shared books, acting as `holder`.
pub struct InMemoryCustody {
    holder: AccountId,
    books: Arc<InMemoryBooks>,
}

impl InMemoryCustody {
    pub fn new(holder: AccountId, books: Arc<InMemoryBooks>) -> Self {
        Self { holder, books }
    }
}

#[async_trait]
impl AssetCustody for InMemoryCustody {
    fn holder(&self) -> AccountId {
        self.holder
    }

    #[instrument(skip(self), fields(holder = %self.holder))]
    async fn transfer(&self, asset: AssetId, to: AccountId, amount: Amount) -> Result<()> {
        self.books.transfer(asset, self.holder, to, amount).await?;
        debug!(%asset, %to, amount = %amount, "Transferred");
        Ok(())
    }

    #[instrument(skip(self), fields(holder = %self.holder))]
    async fn transfer_from(&self, asset: AssetId, from: AccountId, to: AccountId, amount: Amount) -> Result<()> {
        self.books
            .transfer_from(asset, self.holder, from, to, amount)
            .await?;
        debug!(%asset, %from, %to, amount = %amount, "Pulled");
        Ok(())
    }

    async fn approve(&self, asset: AssetId, spender: AccountId, amount: Amount) -> Result<()> {
        self.books.approve(asset, self.holder, spender, amount).await;
        Ok(())
    }

    async fn balance_of(&self, asset: AssetId, holder: AccountId) -> Result<Amount> {
        Ok(self.books.balance(asset, holder).await)
    }

    #[instrument(skip(self, legs), fields(holder = %self.holder, legs = legs.len()))]
    async fn transfer_batch(&self, asset: AssetId, legs: &[(AccountId, Amount)]) -> Result<()> {
        self.books.transfer_batch(asset, self.holder, legs).await
    }
}
