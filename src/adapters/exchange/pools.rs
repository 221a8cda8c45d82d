//! Constant-Product Pools - In-Memory Exchange
//!
//! Uniswap-V2 style pairs held on the shared custody books. Swaps pull
//! the input through an allowance granted to the pool account and pay
//! the output from pool reserves, atomically.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::adapters::custody::InMemoryBooks;
use crate::domain::amm::{PairReserves, quote_out};
use crate::domain::types::{AccountId, Amount, AssetId};
use crate::ports::clock::Clock;
use crate::ports::exchange::{AssetExchange, SwapRequest};

/// Reserves keyed by the ordered pair `(low, high)`.
#[derive(Debug, Clone, Copy)]
struct Pair {
    reserve_low: Amount,
    reserve_high: Amount,
}

/// Serializable reserves of one pair, ordered by asset address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairEntry {
    pub asset_low: AssetId,
    pub asset_high: AssetId,
    pub reserve_low: Amount,
    pub reserve_high: Amount,
}

fn pair_key(a: AssetId, b: AssetId) -> (AssetId, AssetId) {
    if a < b { (a, b) } else { (b, a) }
}

/// Set of constant-product pairs owned by one pool account.
pub struct ConstantProductPools {
    account: AccountId,
    books: Arc<InMemoryBooks>,
    clock: Arc<dyn Clock>,
    pairs: Mutex<HashMap<(AssetId, AssetId), Pair>>,
}

impl ConstantProductPools {
    pub fn new(account: AccountId, books: Arc<InMemoryBooks>, clock: Arc<dyn Clock>) -> Self {
        Self {
            account,
            books,
            clock,
            pairs: Mutex::new(HashMap::new()),
        }
    }

    /// Create a pair and mint its reserves to the pool account.
    #[instrument(skip(self))]
    pub async fn seed(&self, asset_a: AssetId, asset_b: AssetId, reserve_a: Amount, reserve_b: Amount) -> Result<()> {
        anyhow::ensure!(asset_a != asset_b, "pair needs two distinct assets");
        let mut pairs = self.pairs.lock().await;
        let key = pair_key(asset_a, asset_b);
        anyhow::ensure!(!pairs.contains_key(&key), "pair {asset_a}/{asset_b} already exists");

        self.books.mint(asset_a, self.account, reserve_a).await?;
        self.books.mint(asset_b, self.account, reserve_b).await?;
        let pair = if key.0 == asset_a {
            Pair { reserve_low: reserve_a, reserve_high: reserve_b }
        } else {
            Pair { reserve_low: reserve_b, reserve_high: reserve_a }
        };
        pairs.insert(key, pair);
        info!(%asset_a, %asset_b, reserve_a = %reserve_a, reserve_b = %reserve_b, "Pool seeded");
        Ok(())
    }

    /// Export every pair. Balances live in the books snapshot.
    pub async fn snapshot(&self) -> Vec<PairEntry> {
        let mut entries: Vec<PairEntry> = self
            .pairs
            .lock()
            .await
            .iter()
            .map(|(key, pair)| PairEntry {
                asset_low: key.0,
                asset_high: key.1,
                reserve_low: pair.reserve_low,
                reserve_high: pair.reserve_high,
            })
            .collect();
        entries.sort_by_key(|e| (e.asset_low, e.asset_high));
        entries
    }

    /// Reinstate pairs without minting; the books must already hold the reserves.
    pub async fn restore(&self, entries: Vec<PairEntry>) {
        let mut pairs = self.pairs.lock().await;
        for entry in entries {
            pairs.insert(
                pair_key(entry.asset_low, entry.asset_high),
                Pair { reserve_low: entry.reserve_low, reserve_high: entry.reserve_high },
            );
        }
    }

    fn oriented(key: (AssetId, AssetId), asset_in: AssetId, pair: Pair) -> PairReserves {
        if key.0 == asset_in {
            PairReserves { reserve_in: pair.reserve_low, reserve_out: pair.reserve_high }
        } else {
            PairReserves { reserve_in: pair.reserve_high, reserve_out: pair.reserve_low }
        }
    }
}

#[async_trait]
impl AssetExchange for ConstantProductPools {
    fn spender(&self) -> AccountId {
        self.account
    }

    async fn pair_reserves(&self, asset_in: AssetId, asset_out: AssetId) -> Result<Option<PairReserves>> {
        let key = pair_key(asset_in, asset_out);
        Ok(self
            .pairs
            .lock()
            .await
            .get(&key)
            .map(|pair| Self::oriented(key, asset_in, *pair)))
    }

    #[instrument(skip(self), fields(pool = %self.account))]
    async fn swap_exact_in(&self, request: SwapRequest) -> Result<Amount> {
        let now = self.clock.now();
        anyhow::ensure!(
            now <= request.deadline,
            "swap deadline {} passed at {now}",
            request.deadline
        );

        let key = pair_key(request.asset_in, request.asset_out);
        let mut pairs = self.pairs.lock().await;
        let pair = pairs
            .get_mut(&key)
            .ok_or_else(|| anyhow::anyhow!("no pair {}/{}", request.asset_in, request.asset_out))?;
        let reserves = Self::oriented(key, request.asset_in, *pair);

        let out = quote_out(request.amount_in, reserves)?;
        anyhow::ensure!(
            out >= request.min_out,
            "output {out} below minimum {}",
            request.min_out
        );
        let new_in = reserves
            .reserve_in
            .checked_add(request.amount_in)
            .ok_or_else(|| anyhow::anyhow!("reserve overflow"))?;
        let new_out = reserves.reserve_out - out;

        self.books
            .exchange(
                (request.asset_in, request.payer, self.account, request.amount_in),
                (request.asset_out, self.account, request.recipient, out),
                self.account,
            )
            .await?;

        if key.0 == request.asset_in {
            *pair = Pair { reserve_low: new_in, reserve_high: new_out };
        } else {
            *pair = Pair { reserve_low: new_out, reserve_high: new_in };
        }
        info!(amount_in = %request.amount_in, amount_out = %out, "Swap executed");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clock::ManualClock;
    use alloy::primitives::Address;

    const DAI: Address = Address::repeat_byte(0xd1);
    const USDC: Address = Address::repeat_byte(0xaa);

    async fn setup() -> (Arc<InMemoryBooks>, ConstantProductPools) {
        let books = Arc::new(InMemoryBooks::new());
        let clock = Arc::new(ManualClock::new(1_000));
        let pools = ConstantProductPools::new(Address::repeat_byte(0xee), books.clone(), clock);
        pools.seed(USDC, DAI, 1_000_000, 2_000_000).await.unwrap();
        (books, pools)
    }

    #[tokio::test]
    async fn test_reserves_are_oriented() {
        let (_, pools) = setup().await;
        let r = pools.pair_reserves(USDC, DAI).await.unwrap().unwrap();
        assert_eq!((r.reserve_in, r.reserve_out), (1_000_000, 2_000_000));
        let r = pools.pair_reserves(DAI, USDC).await.unwrap().unwrap();
        assert_eq!((r.reserve_in, r.reserve_out), (2_000_000, 1_000_000));
        assert!(pools.pair_reserves(USDC, Address::repeat_byte(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_swap_moves_funds_and_reserves() {
        let (books, pools) = setup().await;
        let payer = Address::repeat_byte(1);
        books.mint(USDC, payer, 1_000).await.unwrap();
        books.approve(USDC, payer, pools.spender(), 1_000).await;

        let out = pools
            .swap_exact_in(SwapRequest {
                asset_in: USDC,
                asset_out: DAI,
                amount_in: 1_000,
                min_out: 1_950,
                deadline: 1_300,
                payer,
                recipient: payer,
            })
            .await
            .unwrap();
        assert_eq!(out, 1_992);
        assert_eq!(books.balance(DAI, payer).await, 1_992);
        let r = pools.pair_reserves(USDC, DAI).await.unwrap().unwrap();
        assert_eq!((r.reserve_in, r.reserve_out), (1_001_000, 2_000_000 - 1_992));
    }

    #[tokio::test]
    async fn test_restore_does_not_mint() {
        let (books, pools) = setup().await;
        let entries = pools.snapshot().await;
        assert_eq!(entries.len(), 1);

        let clock = Arc::new(ManualClock::new(1_000));
        let restored = ConstantProductPools::new(Address::repeat_byte(0xee), books.clone(), clock);
        restored.restore(entries).await;
        let r = restored.pair_reserves(DAI, USDC).await.unwrap().unwrap();
        assert_eq!((r.reserve_in, r.reserve_out), (2_000_000, 1_000_000));
        assert_eq!(books.balance(USDC, Address::repeat_byte(0xee)).await, 1_000_000);
    }

    #[tokio::test]
    async fn test_swap_bounds() {
        let (books, pools) = setup().await;
        let payer = Address::repeat_byte(1);
        books.mint(USDC, payer, 1_000).await.unwrap();
        books.approve(USDC, payer, pools.spender(), 1_000).await;
        let request = SwapRequest {
            asset_in: USDC,
            asset_out: DAI,
            amount_in: 1_000,
            min_out: 1_993,
            deadline: 1_300,
            payer,
            recipient: payer,
        };

        assert!(pools.swap_exact_in(request).await.is_err());
        let late = SwapRequest { min_out: 0, deadline: 999, ..request };
        assert!(pools.swap_exact_in(late).await.is_err());
        assert_eq!(books.balance(USDC, payer).await, 1_000);
    }
}
