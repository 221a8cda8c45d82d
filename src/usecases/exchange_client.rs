//! Exchange Client Use Case - Quote and Bounded-Slippage Conversion
//!
//! Converts a bettor's payment asset into a proposal's payout asset.
//! Every swap is bounded by a minimum output derived from a fresh quote
//! (default 98% of it) and a short absolute deadline.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::domain::amm::{min_out, quote_out};
use crate::domain::error::{Result, VenueError};
use crate::domain::types::{Amount, AssetId, Bps};
use crate::ports::clock::Clock;
use crate::ports::custody::AssetCustody;
use crate::ports::exchange::{AssetExchange, SwapRequest};

/// Default slippage tolerance (2%).
pub const DEFAULT_SLIPPAGE_BPS: Bps = 200;
/// Default swap deadline offset (5 minutes).
pub const DEFAULT_SWAP_DEADLINE_SECS: u64 = 300;

/// Result of one conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
  pub amount_in: Amount,
  pub quoted: Amount,
  pub min_out: Amount,
  pub amount_out: Amount,
}

/// Quotes and converts between payment assets for the venue's custody.
pub struct ExchangeClient {
  exchange: Arc<dyn AssetExchange>,
  custody: Arc<dyn AssetCustody>,
  clock: Arc<dyn Clock>,
  slippage_bps: Bps,
  deadline_secs: u64,
}

impl ExchangeClient {
  pub fn new(
    exchange: Arc<dyn AssetExchange>,
    custody: Arc<dyn AssetCustody>,
    clock: Arc<dyn Clock>,
  ) -> Self {
    Self {
      exchange,
      custody,
      clock,
      slippage_bps: DEFAULT_SLIPPAGE_BPS,
      deadline_secs: DEFAULT_SWAP_DEADLINE_SECS,
    }
  }

  /// Override the slippage tolerance and deadline offset.
  pub fn with_bounds(mut self, slippage_bps: Bps, deadline_secs: u64) -> Self {
    self.slippage_bps = slippage_bps;
    self.deadline_secs = deadline_secs;
    self
  }

  /// Expected output of swapping `amount_in` through the pair.
  ///
  /// # Errors
  /// `Liquidity` if no pool exists or a reserve is zero.
  pub async fn quote(&self, asset_in: AssetId, asset_out: AssetId, amount_in: Amount) -> Result<Amount> {
    let reserves = self
      .exchange
      .pair_reserves(asset_in, asset_out)
      .await
      .map_err(|e| VenueError::Liquidity(format!("pair lookup failed: {e:#}")))?
      .ok_or_else(|| VenueError::Liquidity(format!("no pool for {asset_in}/{asset_out}")))?;
    quote_out(amount_in, reserves)
  }

  /// Swap custody-held `asset_in` into `asset_out`.
  ///
  /// The venue approves the exchange for exactly `amount_in`; on failure
  /// the approval is withdrawn and custody keeps the input.
  #[instrument(skip(self))]
  pub async fn convert(&self, asset_in: AssetId, asset_out: AssetId, amount_in: Amount) -> Result<Conversion> {
    let quoted = self.quote(asset_in, asset_out, amount_in).await?;
    let minimum = min_out(quoted, self.slippage_bps)?;
    if minimum == 0 {
      return Err(VenueError::Liquidity(format!(
        "{amount_in} of {asset_in} converts to nothing"
      )));
    }

    let spender = self.exchange.spender();
    let holder = self.custody.holder();
    self
      .custody
      .approve(asset_in, spender, amount_in)
      .await
      .map_err(|e| VenueError::Custody(format!("approve failed: {e:#}")))?;

    let request = SwapRequest {
      asset_in,
      asset_out,
      amount_in,
      min_out: minimum,
      deadline: self.clock.now().saturating_add(self.deadline_secs),
      payer: holder,
      recipient: holder,
    };

    match self.exchange.swap_exact_in(request).await {
      Ok(amount_out) if amount_out >= minimum => {
        info!(amount_in = %amount_in, quoted = %quoted, amount_out = %amount_out, "Conversion executed");
        Ok(Conversion { amount_in, quoted, min_out: minimum, amount_out })
      }
      Ok(amount_out) => Err(VenueError::Consistency(format!(
        "exchange returned {amount_out} below the enforced minimum {minimum}"
      ))),
      Err(e) => {
        if let Err(revoke) = self.custody.approve(asset_in, spender, 0).await {
          warn!(error = %revoke, "Failed to revoke exchange approval");
        }
        Err(VenueError::Liquidity(format!("swap failed: {e:#}")))
      }
    }
  }
}
